//! nccell probe
//!
//! Prints what the cell core resolved for a host: the profile, every native
//! layout, and the cells of a sample string. Optionally binds the native
//! library and reports its version.

use std::io;
use std::process::ExitCode;

use ncurses_cell::{Attr, Config, Context, HostProfile, LayoutDescriptor};
use serde::Serialize;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Serialize)]
struct Report {
    profile: HostProfile,
    wide: LayoutDescriptor,
    narrow: LayoutDescriptor,
    mouse: LayoutDescriptor,
    field_bytes: usize,
    sample: Sample,
    #[serde(skip_serializing_if = "Option::is_none")]
    binding: Option<Binding>,
}

#[derive(Serialize)]
struct Sample {
    text: String,
    output_len: usize,
    intermediate_len: usize,
    cells: Vec<String>,
    decoded: String,
}

#[derive(Serialize)]
struct Binding {
    library: String,
    version: Option<String>,
    error: Option<String>,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut host: Option<String> = None;
    let mut sample = String::from("héllo");
    let mut json = false;
    let mut bind = false;
    let mut show_help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                i += 1;
                if i < args.len() {
                    host = Some(args[i].clone());
                }
            },
            "-j" | "--json" => {
                json = true;
            },
            "-b" | "--bind" => {
                bind = true;
            },
            "-h" | "--help" => {
                show_help = true;
            },
            other => {
                if !other.starts_with('-') {
                    sample = other.to_string();
                }
            },
        }
        i += 1;
    }

    if show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        },
    };
    if host.is_some() {
        config.host = host;
    }

    let ctx = match Context::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error creating context: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let sample = match probe_sample(&ctx, &sample) {
        Ok(sample) => sample,
        Err(e) => {
            eprintln!("Error encoding sample: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let binding = bind.then(|| match ctx.bind_native_entry_points() {
        Ok(table) => Binding {
            library: table.library().to_string(),
            version: table.version().ok(),
            error: None,
        },
        Err(e) => Binding {
            library: ctx.profile().library_base_name.clone(),
            version: None,
            error: Some(e.to_string()),
        },
    });

    let report = Report {
        profile: ctx.profile().clone(),
        wide: *ctx.wide_layout(),
        narrow: *ctx.narrow_layout(),
        mouse: *ctx.mouse_layout(),
        field_bytes: ctx.wide_layout().field_bytes(),
        sample,
        binding,
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                return ExitCode::FAILURE;
            },
        }
    } else {
        print_report(&report);
    }

    match &report.binding {
        Some(Binding { error: Some(_), .. }) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn probe_sample(ctx: &Context, text: &str) -> ncurses_cell::Result<Sample> {
    let encoded = ctx.encode_string(text, Attr::empty(), None, true)?;
    let cells = encoded.iter().map(|cell| hex(cell.payload())).collect();
    Ok(Sample {
        text: text.to_string(),
        output_len: encoded.output_len(),
        intermediate_len: encoded.intermediate_len(),
        cells,
        decoded: encoded.decode(),
    })
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_layout(name: &str, layout: &LayoutDescriptor) {
    let ext = layout
        .ext_color_offset
        .map(|offset| offset.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {:<7} {:?}: size {} align {} attr @{}+{} payload @{}+{} ext_color @{}",
        name,
        layout.kind,
        layout.size,
        layout.align,
        layout.attr_offset,
        layout.attr_len,
        layout.payload_offset,
        layout.payload_len,
        ext
    );
}

fn print_report(report: &Report) {
    let profile = &report.profile;
    println!("Profile:");
    println!("  library  {}", profile.library_base_name);
    println!("  family   {:?} (ABI {:?})", profile.family, profile.abi);
    println!("  wchar_t  {} bytes", profile.wide_char_width.bytes());
    println!("  chtype   {} bits", profile.generic_char_width.bits());
    println!();
    println!("Layouts:");
    print_layout("wide", &report.wide);
    print_layout("narrow", &report.narrow);
    print_layout("mouse", &report.mouse);
    println!("  wide field bytes: {}", report.field_bytes);
    println!();
    println!("Sample {:?}:", report.sample.text);
    println!(
        "  {} cells, {} intermediate bytes",
        report.sample.output_len, report.sample.intermediate_len
    );
    for (i, cell) in report.sample.cells.iter().enumerate() {
        println!("  [{:>3}] {}", i, cell);
    }
    println!("  decoded {:?}", report.sample.decoded);

    if let Some(binding) = &report.binding {
        println!();
        println!("Binding {}:", binding.library);
        match (&binding.version, &binding.error) {
            (_, Some(error)) => println!("  failed: {}", error),
            (Some(version), None) => println!("  bound, {}", version),
            (None, None) => println!("  bound, version unavailable"),
        }
    }
}

fn print_help() {
    println!("nccell probe");
    println!();
    println!("Usage: nccell-probe [OPTIONS] [SAMPLE]");
    println!();
    println!("Options:");
    println!("  --host <ID>   Resolve a host identifier instead of the running host");
    println!("  -b, --bind    Load the native library and bind its entry points");
    println!("  -j, --json    Output the report as JSON");
    println!("  -h, --help    Show this help message");
    println!();
    println!("Environment:");
    println!("  NCCELL_CONFIG   Path to a TOML configuration file");
    println!("  NCCELL_HOST     Host identifier override");
    println!("  NCCELL_LIBRARY  Native library base name override");
    println!("  RUST_LOG        Log filter (default: warn)");
    println!();
    println!("Examples:");
    println!("  nccell-probe");
    println!("  nccell-probe --host win10-x64 'a😀'");
    println!("  nccell-probe --bind --json");
}
