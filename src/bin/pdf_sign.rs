//! Sign a PDF with the signers configured in the settings file.
//!
//! Usage:
//!   APP_SETTINGS_FILE=settings.json cargo run --release --bin pdf_sign -- --pem --p12 document.pdf
//!
//! Writes `document_pem_signed.pdf` and/or `document_p12_signed.pdf` next to
//! the input. Log lines go to stderr and to `<logger.directory>/<date>_<logger.file>`.
//!
//! Key vault signing needs an application-supplied custody client, so it is
//! only available through the library (`KeyVaultSigner::from_vault`).

use pdf_signet::config::{AppSettings, LoggerConfig};
use pdf_signet::signatures::{sign, P12Signer, PemSigner, Signer};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

const USAGE: &str = "Usage: pdf_sign [--pem] [--p12] <pdfPath>\n\
    \x20 --keyvault is not available here: key vault signing needs a custody client \
    supplied through the pdf_signet library (KeyVaultSigner::from_vault).";

const KEYVAULT_UNSUPPORTED: &str = "Key vault signing is not available from the command line. \
    Use the pdf_signet library with an application-supplied KeyCustodyClient.";

#[derive(Debug, Default)]
struct CliArgs {
    use_pem: bool,
    use_p12: bool,
    use_keyvault: bool,
    pdf_path: Option<PathBuf>,
}

impl CliArgs {
    fn from_args() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    fn parse<I: IntoIterator<Item = String>>(raw: I) -> Self {
        let mut args = CliArgs::default();
        for arg in raw {
            match arg.as_str() {
                "--pem" => args.use_pem = true,
                "--p12" => args.use_p12 = true,
                "--keyvault" => args.use_keyvault = true,
                other if !other.starts_with("--") && args.pdf_path.is_none() => {
                    args.pdf_path = Some(PathBuf::from(other));
                },
                _ => {},
            }
        }
        args
    }
}

/// Writes every log line to stderr and the dated log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn init_logging(logger: &LoggerConfig) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let log_path = logger.file_path(&date);
    let log_file = fs::create_dir_all(&logger.directory)
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&log_path));
    match log_file {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
        },
        Err(e) => eprintln!("Cannot open log file {}: {}", log_path.display(), e),
    }
    builder.init();
}

fn signed_path(pdf_path: &Path, method: &str) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    pdf_path.with_file_name(format!("{}_{}_signed.pdf", stem, method))
}

fn exit_with(banner: &str, message: &str) -> ! {
    println!("{}", banner);
    println!("{}", message);
    process::exit(1);
}

fn sign_and_write(
    input: &[u8],
    signer: &dyn Signer,
    settings: &AppSettings,
    pdf_path: &Path,
    method: &str,
) -> pdf_signet::Result<PathBuf> {
    let signed = futures::executor::block_on(sign(input, signer, &settings.signature_options))?;
    let output = signed_path(pdf_path, method);
    fs::write(&output, signed)?;
    Ok(output)
}

fn run(settings: &AppSettings, args: &CliArgs, pdf_path: &Path) -> pdf_signet::Result<()> {
    let input = fs::read(pdf_path)?;
    log::info!(" > PDF loaded");

    if let (true, Some(pem)) = (args.use_pem, &settings.pem_certificate) {
        log::info!(" > Signing with the PEM certificate and private key...");
        let key = fs::read_to_string(&pem.key_path)?;
        let chain = fs::read_to_string(&pem.full_chain_path)?;
        let signer = PemSigner::new(&key, &chain)?;
        let output = sign_and_write(&input, &signer, settings, pdf_path, "pem")?;
        log::info!("PEM signing complete: {}", output.display());
    }

    if let (true, Some(p12)) = (args.use_p12, &settings.p12_certificate) {
        log::info!(" > Signing with the P12 certificate...");
        let data = fs::read(&p12.path)?;
        let signer = P12Signer::new(&data, p12.password.as_deref())?;
        let output = sign_and_write(&input, &signer, settings, pdf_path, "p12")?;
        log::info!("P12 signing complete: {}", output.display());
    }

    Ok(())
}

fn main() {
    let settings = match AppSettings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        },
    };
    let banner = settings.banner();
    let args = CliArgs::from_args();

    if args.use_keyvault {
        exit_with(&banner, KEYVAULT_UNSUPPORTED);
    }
    let pdf_path = match (&args.pdf_path, args.use_pem || args.use_p12) {
        (Some(path), true) => path.clone(),
        _ => exit_with(&banner, USAGE),
    };

    if args.use_pem && settings.pem_certificate.is_none() {
        exit_with(&banner, "The PEM signing method is not configured.");
    }
    if args.use_p12 && settings.p12_certificate.as_ref().map_or(true, |p| p.path.is_empty()) {
        exit_with(&banner, "The P12 signing method is not configured.");
    }
    if File::open(&pdf_path).is_err() {
        exit_with(
            &banner,
            &format!("The file does not exist or is not readable: {}", pdf_path.display()),
        );
    }

    init_logging(&settings.logger);
    log::info!("{}", banner);
    log::info!("Start the signing process with PDF: {}", pdf_path.display());

    if let Err(e) = run(&settings, &args, &pdf_path) {
        log::error!("An error occurred during the signing process: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_path() {
        let path = Path::new("/tmp/docs/contract.pdf");
        assert_eq!(signed_path(path, "pem"), Path::new("/tmp/docs/contract_pem_signed.pdf"));
        assert_eq!(signed_path(path, "p12"), Path::new("/tmp/docs/contract_p12_signed.pdf"));
    }

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_parse_methods_and_path() {
        let args = parse(&["--p12", "--pem", "contract.pdf", "extra.pdf"]);
        assert!(args.use_pem && args.use_p12 && !args.use_keyvault);
        assert_eq!(args.pdf_path, Some(PathBuf::from("contract.pdf")));
    }

    #[test]
    fn test_keyvault_flag_is_recognised() {
        let args = parse(&["--keyvault", "contract.pdf"]);
        assert!(args.use_keyvault);
        assert!(!args.use_pem && !args.use_p12);
        assert!(USAGE.contains("--keyvault"));
        assert!(KEYVAULT_UNSUPPORTED.contains("KeyCustodyClient"));
    }
}
