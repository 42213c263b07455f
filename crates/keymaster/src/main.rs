use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    discover_server, generate_mod_mapping, sync_keys, DiscoverArgs, GenerateMappingArgs,
    SyncArgs,
};
use miette::Result;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to daily files in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish the keys required by a server's mods to its FTP key directory
    Sync {
        /// URL of the run configuration (http(s):// or file://)
        #[arg(short, long)]
        config: String,

        /// Directory to download keys into before uploading
        #[arg(long)]
        staging_dir: Option<String>,

        /// Resolve mods, keys and the PAR file, then stop before downloading or uploading
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate a mapping file from a local mod directory
    GenerateMapping {
        /// The local mod folder to scan
        #[arg(short, long = "inputDir", alias = "input-dir")]
        input_dir: String,

        /// Where to write the mapping file
        #[arg(short, long = "outputFile", alias = "output-file")]
        output_file: String,

        /// Copy every key file found next to the mapping file
        #[arg(long = "captureKeys", alias = "capture-keys")]
        capture_keys: bool,
    },
    /// Show a server's mods and the files in its remote key directory
    Discover {
        /// URL of the third-party server config
        #[arg(long = "pw6ConfigUrl", alias = "pw6-config-url")]
        pw6_config_url: String,

        /// FTP server, as host or host:port
        #[arg(long = "ftpAddress", alias = "ftp-address")]
        ftp_address: String,

        #[arg(long = "loginName", alias = "login-name")]
        login_name: String,

        #[arg(long)]
        password: String,

        /// Remote key directory to list
        #[arg(long = "ftpDir", alias = "ftp-dir")]
        ftp_dir: String,
    },
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    let _log_guard = utils::logging::init_logging(args.verbose, args.log_dir.as_deref());
    let settings = utils::config::load_config();

    match args.command {
        Commands::Sync {
            config,
            staging_dir,
            dry_run,
        } => sync_keys(
            SyncArgs {
                config_url: config,
                staging_dir,
                dry_run,
            },
            &settings,
        ),
        Commands::GenerateMapping {
            input_dir,
            output_file,
            capture_keys,
        } => generate_mod_mapping(GenerateMappingArgs {
            input_dir,
            output_file,
            capture_keys,
        }),
        Commands::Discover {
            pw6_config_url,
            ftp_address,
            login_name,
            password,
            ftp_dir,
        } => discover_server(
            DiscoverArgs {
                server_config_url: pw6_config_url,
                ftp_address,
                login_name,
                password,
                ftp_dir,
            },
            &settings,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_generate_mapping_camel_case_flags() {
        let args = Args::try_parse_from([
            "keymaster",
            "generate-mapping",
            "--inputDir",
            "mods",
            "--outputFile",
            "out/mapping.json",
            "--captureKeys",
        ])
        .unwrap();

        match args.command {
            Commands::GenerateMapping {
                input_dir,
                output_file,
                capture_keys,
            } => {
                assert_eq!(input_dir, "mods");
                assert_eq!(output_file, "out/mapping.json");
                assert!(capture_keys);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_sync_requires_config() {
        let err = Args::try_parse_from(["keymaster", "sync"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "keymaster",
            "sync",
            "--config",
            "file:///tmp/config.json",
            "--dry-run",
            "--verbose",
        ])
        .unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::Sync { dry_run: true, .. }));
    }
}
