use clap::{Args, Parser, Subcommand, ValueEnum};
use tapkey_common::keycodes::key_range;
use tapkey_config::{
    compiler::KeyboardConfig,
    keycodes::{self, KeycodeDesc},
    pretty_compile,
};
use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use anyhow::{Result, anyhow};

/// Compile and inspect tapkey keymaps
#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List keycode names
    Keycodes(ListKeycodesArgs),
    /// Validate a keymap file
    Validate(ValidateArgs),
    /// Compile a keymap file to the binary keymap format
    Compile(CompileArgs),
}

#[derive(Copy, Clone, ValueEnum)]
enum CodeType {
    Basic,
    Modifier,
    Consumer,
}

#[derive(Args)]
struct ListKeycodesArgs {
    /// Include extra information including the keycode hex value
    #[clap(long, short)]
    verbose: bool,

    /// Sort results by keycode; Defaults to sorting by name
    #[clap(long, short)]
    sort_by_keycode: bool,

    /// Limit to keycode type
    #[clap(long, short)]
    code_type: Option<CodeType>,

    /// Only list key names than contains pattern (case insensitive) if pattern starts with 0x then
    /// key names matching the key code will be shown.
    #[clap()]
    pattern: Option<String>,
}

#[derive(Args)]
struct ValidateArgs {
    /// Display information about the keymap
    #[clap(long, short)]
    verbose: bool,

    /// keymap description file
    file: PathBuf,
}

#[derive(Args)]
struct CompileArgs {
    /// keymap description file
    file: PathBuf,

    /// where to write the binary keymap
    #[clap(long, short)]
    output: PathBuf,
}

fn compile_error(file: &Path, err: &str) -> anyhow::Error {
    anyhow!("Failed to compile \"{}\"!\n    {}", file.display(), err)
}

fn compile_file<'s>(file: &Path, src: &'s str) -> Result<KeyboardConfig<'s>> {
    pretty_compile(file, src).map_err(|err| {
        if err.span.is_none() {
            compile_error(file, &err.message)
        } else {
            // already reported with its source context
            compile_error(file, "see above")
        }
    })
}

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).map_err(|err| compile_error(file, &err.to_string()))
}

fn validate(args: &ValidateArgs) -> Result<()> {
    let file = &args.file;
    let src = read_source(file)?;
    let conf = compile_file(file, &src)?;
    if args.verbose {
        println!("binary size: {}", conf.serialize().len() * 2);
        println!("layers:      {}", conf.layer_count());
        println!("tapdances:   {}", conf.tapdance_count());
        println!("unicode:     {}", conf.unicode_table().len());
        println!("dual:        {}", conf.dual_table().len());
        println!("tapholds:    {}", conf.tap_hold_table().len());
    }
    Ok(())
}

fn to_bytes(words: &[u16]) -> Vec<u8> {
    words
        .iter()
        .flat_map(|w| u16::from_le(*w).to_le_bytes())
        .collect()
}

fn compile(args: &CompileArgs) -> Result<()> {
    let file = &args.file;
    let src = read_source(file)?;
    let conf = compile_file(file, &src)?;
    let bytes = to_bytes(&conf.serialize());
    fs::write(&args.output, &bytes)
        .map_err(|err| anyhow!("Failed to write \"{}\": {err}", args.output.display()))?;
    log::info!("wrote {} bytes to {}", bytes.len(), args.output.display());
    Ok(())
}

fn select_keycodes(args: &ListKeycodesArgs) -> Result<Vec<&'static KeycodeDesc>> {
    let iter = keycodes::keycodes_iter().filter(|d| match args.code_type {
        Some(CodeType::Basic) => d.code <= key_range::BASIC_MAX && !key_range::is_modifier(d.code),
        Some(CodeType::Modifier) => key_range::is_modifier(d.code),
        Some(CodeType::Consumer) => {
            (key_range::CONSUMER_MIN..=key_range::CONSUMER_MAX).contains(&d.code)
        }
        None => true,
    });
    let mut codes = if let Some(pattern) = &args.pattern {
        let pattern = pattern.to_lowercase();
        if let Some(hex) = pattern.strip_prefix("0x") {
            let pattern = u16::from_str_radix(hex, 16)?;
            iter.filter(|p| p.code == pattern).collect::<Vec<_>>()
        } else {
            let pattern = pattern.as_str();
            iter.filter(|p| {
                p.name.to_lowercase().contains(pattern)
                    || p.aliases.iter().any(|a| a.to_lowercase().contains(pattern))
            })
            .collect::<Vec<_>>()
        }
    } else {
        iter.collect::<Vec<_>>()
    };
    if args.sort_by_keycode {
        codes.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.name.cmp(b.name)));
    } else {
        codes.sort_by_key(|k| k.name.to_lowercase());
    }
    Ok(codes)
}

fn list_keycodes(args: &ListKeycodesArgs) -> Result<()> {
    for d in select_keycodes(args)? {
        if args.verbose {
            if d.aliases.is_empty() {
                println!("{:03X}: {}", d.code, d.name);
            } else {
                println!("{:03X}: {} ({})", d.code, d.name, d.aliases.join(", "));
            }
        } else {
            println!("{}", d.name);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = run(&cli);

    if let Err(message) = result {
        eprintln!("{message}");
        process::exit(1);
    };
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Validate(args) => validate(args),
        Commands::Compile(args) => compile(args),
        Commands::Keycodes(args) => list_keycodes(args),
    }
}
