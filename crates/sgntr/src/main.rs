#![forbid(unsafe_code)]

//! sgntr CLI: sign and verify DataPDU envelopes.

use clap::{Parser, Subcommand};
use sgntr_core::{algorithm, ns, Error};
use sgntr_keys::loader::{load_certificates, load_credential_files, load_pkcs12_credential};
use sgntr_keys::Credential;
use sgntr_xades::XadesContext;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(
    name = "sgntr",
    about = "XAdES-BES signatures for DataPDU payment envelopes",
    version
)]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign an unsigned DataPDU envelope
    Sign {
        /// Envelope XML file with an AppHdr/Sgntr element
        input: PathBuf,

        /// Signer X.509 certificate (PEM or DER)
        #[arg(long, required_unless_present = "pkcs12", requires = "key")]
        cert: Option<PathBuf>,

        /// Signer RSA private key (PKCS#8 or PKCS#1, PEM or DER)
        #[arg(short = 'k', long, conflicts_with = "pkcs12")]
        key: Option<PathBuf>,

        /// Signer certificate and key as a PKCS#12 bundle (.p12/.pfx)
        #[arg(long, conflicts_with = "cert")]
        pkcs12: Option<PathBuf>,

        /// Password of the PKCS#12 bundle
        #[arg(long, requires = "pkcs12")]
        password: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// SigningTime to stamp instead of now (RFC 3339)
        #[arg(long = "signing-time")]
        signing_time: Option<String>,
    },

    /// Verify a signed DataPDU envelope
    Verify {
        /// Signed envelope XML file
        file: PathBuf,

        /// Signer X.509 certificate (PEM or DER)
        #[arg(long, required_unless_present = "pkcs12")]
        cert: Option<PathBuf>,

        /// Take the signer certificate from a PKCS#12 bundle instead
        #[arg(long, conflicts_with = "cert")]
        pkcs12: Option<PathBuf>,

        /// Password of the PKCS#12 bundle
        #[arg(long, requires = "pkcs12")]
        password: Option<String>,

        /// Also validate the certificate chain
        #[arg(long = "full-chain")]
        full_chain: bool,

        /// Trusted CA certificates (PEM bundle or DER), repeatable
        #[arg(long)]
        trusted: Vec<PathBuf>,

        /// Untrusted intermediate certificates, repeatable
        #[arg(long)]
        untrusted: Vec<PathBuf>,

        /// Chain validation time (YYYY-MM-DD+HH:MM:SS)
        #[arg(long = "verification-time")]
        verification_time: Option<String>,

        /// Skip certificate validity period checks
        #[arg(long = "skip-time-checks")]
        skip_time_checks: bool,
    },

    /// List supported algorithms
    Info,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Sign {
            input,
            cert,
            key,
            pkcs12,
            password,
            output,
            signing_time,
        } => load_credential(cert, key, pkcs12, password)
            .and_then(|credential| cmd_sign(input, credential, output, signing_time)),
        Commands::Verify {
            file,
            cert,
            pkcs12,
            password,
            full_chain,
            trusted,
            untrusted,
            verification_time,
            skip_time_checks,
        } => load_credential(cert, None, pkcs12, password).and_then(|credential| {
            cmd_verify(
                file,
                credential,
                full_chain,
                trusted,
                untrusted,
                verification_time,
                skip_time_checks,
            )
        }),
        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Credential from `--pkcs12` or from `--cert` with an optional `--key`.
fn load_credential(
    cert: Option<PathBuf>,
    key: Option<PathBuf>,
    pkcs12: Option<PathBuf>,
    password: Option<String>,
) -> Result<Credential, Error> {
    match (pkcs12, cert) {
        (Some(bundle), _) => {
            load_pkcs12_credential(&read_bytes(&bundle)?, password.as_deref().unwrap_or_default())
        }
        (None, Some(cert)) => load_credential_files(&cert, key.as_deref()),
        (None, None) => Err(Error::Credential(
            "either --cert or --pkcs12 is required".into(),
        )),
    }
}

fn cmd_sign(
    input: PathBuf,
    credential: Credential,
    output: Option<PathBuf>,
    signing_time: Option<String>,
) -> Result<(), Error> {
    let xml = read_file(&input)?;
    let mut ctx = XadesContext::new();
    if let Some(time) = signing_time {
        ctx.signing_time = Some(sgntr_xades::properties::parse_signing_time(&time)?);
    }
    tracing::info!(input = %input.display(), "signing");
    let signed = sgntr_xades::sign(&ctx, &xml, &credential)?;
    write_output(output, signed.as_bytes())
}

fn cmd_verify(
    file: PathBuf,
    credential: Credential,
    full_chain: bool,
    trusted: Vec<PathBuf>,
    untrusted: Vec<PathBuf>,
    verification_time: Option<String>,
    skip_time_checks: bool,
) -> Result<(), Error> {
    let xml = read_file(&file)?;

    let mut ctx = XadesContext::new();
    for path in &trusted {
        for der in load_certificates(&read_bytes(path)?)? {
            ctx.add_trusted_cert(der);
        }
    }
    for path in &untrusted {
        for der in load_certificates(&read_bytes(path)?)? {
            ctx.add_untrusted_cert(der);
        }
    }
    ctx.verification_time = verification_time;
    ctx.skip_time_checks = skip_time_checks;

    tracing::info!(file = %file.display(), full_chain, "verifying");
    match sgntr_xades::verify(&ctx, &xml, &credential, full_chain) {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(
            e @ (Error::DigestMismatch(_)
            | Error::SignatureInvalid(_)
            | Error::ReferenceCount { .. }
            | Error::ChainValidation(_)),
        ) => {
            eprintln!("INVALID: {e}");
            process::exit(1);
        }
        Err(e) => Err(e),
    }
}

fn cmd_info() -> Result<(), Error> {
    println!("sgntr: XAdES-BES for DataPDU envelopes");
    println!();
    println!("Canonicalization:");
    println!("  {}", algorithm::EXC_C14N);
    println!();
    println!("Digest:");
    println!("  {}", algorithm::SHA256);
    println!();
    println!("Signature:");
    println!("  {}", algorithm::RSA_SHA256);
    println!();
    println!("Qualifying properties:");
    println!("  {} (SigningTime)", ns::XADES);
    println!();
    println!("Key formats:");
    println!("  X.509 certificates: PEM, DER");
    println!("  RSA private keys: PKCS#8, PKCS#1 (PEM, DER)");
    println!("  PKCS#12: PBES2 (PBKDF2 + AES-256-CBC), pbeWithSHAAnd3-KeyTripleDES-CBC");
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| with_path(path, e))
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| with_path(path, e))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(|e| with_path(&p, e)),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(data).map_err(Error::Io)
        }
    }
}

fn with_path(path: &Path, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("{}: {e}", path.display()),
    ))
}
