use crate::errors::CliError;
use crate::println_pad;
use camino::Utf8PathBuf;
use colored::Colorize;
use keymaster_core::generate_mapping;

pub struct GenerateMappingArgs {
    pub input_dir: String,
    pub output_file: String,
    pub capture_keys: bool,
}

pub fn generate_mod_mapping(args: GenerateMappingArgs) -> miette::Result<()> {
    let input_dir = Utf8PathBuf::from(args.input_dir);
    let output_file = Utf8PathBuf::from(args.output_file);

    println_pad!(
        "{} {}",
        "🔎 Scanning mod folder:".bright_blue().bold(),
        input_dir.as_str().bright_white()
    );
    let mapping =
        generate_mapping(&input_dir, &output_file, args.capture_keys).map_err(CliError::from)?;

    for (mod_name, keys) in &mapping.mods {
        println_pad!(
            "   {} {} {}",
            "•".bright_cyan(),
            mod_name.bright_cyan().bold(),
            format!("({})", keys.join(", ")).dimmed()
        );
    }

    println_pad!(
        "{} {} {}",
        "📄 Mapping written:".bright_green().bold(),
        output_file.as_str().bright_white(),
        format!("({} mod(s))", mapping.mods.len()).dimmed()
    );
    if args.capture_keys {
        println_pad!(
            "{} {}",
            "🔑 Key files captured:".bright_green().bold(),
            mapping.key_files.len()
        );
    }

    Ok(())
}
