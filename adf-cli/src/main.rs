// Command-line interface for adf
//
// Converts between Atlassian Document Format (ADF) JSON and Markdown.
//
// Usage:
//  adf render <input.json> [--output <file>]            - ADF JSON → Markdown
//  adf parse <input.md> [--output <file>] [--quiet]     - Markdown → ADF JSON, warnings on stderr
//  adf <input> --to <format> [--from <format>]          - Convert between formats (default)
//  adf convert <input> --to <format> [--from <format>]  - Same as above (explicit)
//  adf --list-formats                                   - List available formats
//
// `-` as input reads from stdin.
//
// Extra Parameters:
//
// Format-specific parameters can be passed using --extra-<parameter-name> <value>.
// The CLI layer strips the "extra-" prefix and passes the parameters to the format.
// Example:
//  adf convert issue.json --to markdown --extra-base-url https://example.atlassian.net

use adf_babel::formats::adf::AdfFormat;
use adf_babel::{Format, FormatRegistry, ParseContext, RenderOptions};
use adf_config::{AdfConfig, Loader};
use clap::{Arg, ArgAction, Command, ValueHint};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SUBCOMMANDS: &[&str] = &["render", "parse", "convert", "help"];

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
/// - `--extras-<key>` (alias for `--extra-<key>`)
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        let key_opt = if let Some(key) = arg.strip_prefix("--extra-") {
            Some(key)
        } else {
            arg.strip_prefix("--extras-")
        };

        if let Some(key) = key_opt {
            let has_value = args.get(i + 1).is_some_and(|next| !next.starts_with('-'));

            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Input file path, or '-' for stdin")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .help("Output file path (defaults to stdout)")
        .value_hint(ValueHint::FilePath)
}

fn build_cli() -> Command {
    Command::new("adf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert between Atlassian Document Format and Markdown")
        .long_about(
            "adf converts Jira/Confluence rich text (ADF JSON) to readable Markdown and back.\n\n\
            Commands:\n  \
            - render:  ADF JSON to Markdown\n  \
            - parse:   Markdown to ADF JSON (warnings on stderr)\n  \
            - convert: Between any registered formats (default command)\n\n\
            Extra Parameters:\n  \
            Use --extra-<name> [value] to pass format-specific options.\n  \
            Boolean flags can omit the value (defaults to 'true').\n\n\
            Examples:\n  \
            adf render issue.json                         # Markdown on stdout\n  \
            adf parse notes.md -o notes.json              # ADF JSON file\n  \
            adf notes.md --to adf                         # 'convert' is optional\n  \
            cat issue.json | adf render - --base-url https://example.atlassian.net"
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("list-formats")
                .long("list-formats")
                .help("List available formats")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to an adf.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .value_name("URL")
                .help("Site root for mention links (overrides instance.base_url)")
                .value_hint(ValueHint::Url)
                .global(true),
        )
        .subcommand(
            Command::new("render")
                .about("Render ADF JSON as Markdown")
                .arg(input_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse Markdown into ADF JSON")
                .long_about(
                    "Parse Markdown into ADF JSON.\n\n\
                    Parsing never fails: constructs ADF cannot express are kept as text\n\
                    and reported as warnings on stderr (disable with --quiet or\n\
                    parse.report_warnings = false)."
                )
                .arg(input_arg())
                .arg(output_arg())
                .arg(
                    Arg::new("quiet")
                        .long("quiet")
                        .short('q')
                        .help("Do not print parse warnings")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats (default command)")
                .long_about(
                    "Convert documents between formats.\n\n\
                    Supported formats:\n  \
                    - adf:      ADF JSON (.json, .adf)\n  \
                    - markdown: Markdown (.md, .markdown)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file."
                )
                .arg(input_arg())
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(output_arg()),
        )
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Parse extra-* arguments before clap processing
    let (cleaned_args, mut extra_params) = parse_extra_args(&args);

    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&cleaned_args) {
        Ok(m) => m,
        Err(e) => {
            // A bare file argument means "convert"
            if cleaned_args.len() > 1
                && !cleaned_args[1].starts_with('-')
                && !SUBCOMMANDS.contains(&cleaned_args[1].as_str())
            {
                let mut new_args = vec![cleaned_args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&cleaned_args[1..]);

                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    };

    let mut config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));
    init_logging(&config);

    if matches.get_flag("list-formats") {
        handle_list_formats_command();
        return;
    }

    if let Some(url) = matches.get_one::<String>("base-url") {
        config.instance.base_url = url.clone();
    }
    if let Some(url) = extra_params.remove("base-url") {
        config.instance.base_url = url;
    }

    match matches.subcommand() {
        Some(("render", sub_matches)) => {
            let input = sub_matches
                .get_one::<String>("input")
                .expect("input is required");
            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_render_command(input, output, &config);
        }
        Some(("parse", sub_matches)) => {
            let input = sub_matches
                .get_one::<String>("input")
                .expect("input is required");
            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            let report = config.parse.report_warnings && !sub_matches.get_flag("quiet");
            handle_parse_command(input, output, report, &config);
        }
        Some(("convert", sub_matches)) => {
            let input = sub_matches
                .get_one::<String>("input")
                .expect("input is required");
            let to = sub_matches.get_one::<String>("to").expect("to is required");
            let registry = FormatRegistry::with_base_url(config.instance.base_url());

            // Auto-detect --from if not provided
            let from = match sub_matches.get_one::<String>("from") {
                Some(f) => f.to_string(),
                None => match registry.detect_format_from_filename(input) {
                    Some(detected) => detected,
                    None => {
                        eprintln!("Error: Could not detect format from filename '{input}'");
                        eprintln!("Please specify --from explicitly");
                        std::process::exit(1);
                    }
                },
            };

            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_convert_command(&registry, input, &from, to, output, &extra_params);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

/// Handle the render command
fn handle_render_command(input: &str, output: Option<&str>, config: &AdfConfig) {
    let source = read_input(input);
    let doc = AdfFormat.parse(&source).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });
    let markdown = adf_babel::render(&doc, &RenderOptions::from(config));
    write_output(output, &markdown);
}

/// Handle the parse command
fn handle_parse_command(input: &str, output: Option<&str>, report: bool, config: &AdfConfig) {
    let source = read_input(input);
    let outcome = adf_babel::parse(&source, &ParseContext::from(config));
    if report {
        for warning in &outcome.warnings {
            eprintln!("Warning: {warning}");
        }
    }
    let json = AdfFormat.serialize(&outcome.document).unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        std::process::exit(1);
    });
    write_output(output, &json);
}

/// Handle the convert command
fn handle_convert_command(
    registry: &FormatRegistry,
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
    extra_params: &HashMap<String, String>,
) {
    // Validate formats exist
    if let Err(e) = registry.get(from) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = registry.get(to) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let source = read_input(input);

    let doc = registry.parse(&source, from).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });
    debug!(from, to, blocks = doc.content.len(), "converting");

    let result = registry
        .serialize_with_options(&doc, to, extra_params)
        .unwrap_or_else(|e| {
            eprintln!("Serialization error: {e}");
            std::process::exit(1);
        });

    write_output(output, &result);
}

fn handle_list_formats_command() {
    let registry = FormatRegistry::default();
    println!("Available formats:\n");
    for name in registry.list_formats() {
        if let Ok(format) = registry.get(&name) {
            println!("  {:<10} {}", name, format.description());
        }
    }
}

fn read_input(input: &str) -> String {
    if input == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .unwrap_or_else(|e| {
                eprintln!("Error reading stdin: {e}");
                std::process::exit(1);
            });
        return source;
    }
    fs::read_to_string(input).unwrap_or_else(|e| {
        eprintln!("Error reading file '{input}': {e}");
        std::process::exit(1);
    })
}

fn write_output(output: Option<&str>, text: &str) {
    match output {
        Some(path) => fs::write(path, text).unwrap_or_else(|e| {
            eprintln!("Error writing file '{path}': {e}");
            std::process::exit(1);
        }),
        None => print!("{text}"),
    }
}

fn load_cli_config(explicit_path: Option<&str>) -> AdfConfig {
    let loader = Loader::new().with_optional_file("adf.toml");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

/// Logs go to stderr; `ADF_LOG` overrides the configured filter.
fn init_logging(config: &AdfConfig) {
    let filter = EnvFilter::try_from_env("ADF_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.logging.filter.as_str()));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
