use std::ffi::CString;
use std::{env, io, process};

use clap::{Parser, Subcommand};
use mbind::Exit;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use xkbcommon::xkb;

/// Command line arguments.
#[derive(Parser, Debug)]
#[clap(author, about, version, max_term_width = 80)]
struct Options {
    /// X display to connect to, defaults to `$DISPLAY`.
    #[clap(long, value_name = "NAME")]
    display: Option<String>,

    #[clap(subcommand)]
    pub subcommands: Option<Subcommands>,
}

#[derive(Subcommand, Debug)]
pub enum Subcommands {
    /// Print the compiled-in key bindings.
    Bindings,
}

pub fn main() {
    // Setup logging.
    let directives = env::var("RUST_LOG").unwrap_or("warn,mbind=info".into());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_line_number(true)
        .with_writer(io::stderr)
        .init();

    let options = Options::parse();
    match options.subcommands {
        Some(Subcommands::Bindings) => print_bindings(),
        None => process::exit(run_daemon(options.display)),
    }
}

/// Run the daemon, returning its exit status.
fn run_daemon(display: Option<String>) -> i32 {
    let display = match display.map(CString::new).transpose() {
        Ok(display) => display,
        Err(err) => {
            error!("Invalid display name: {err}");
            return mbind::SETUP_FAILURE;
        },
    };

    match mbind::run(display.as_deref()) {
        Ok(exit @ Exit::Shutdown) => exit.code(),
        Ok(exit) => {
            error!("Terminating: {exit:?}");
            exit.code()
        },
        Err(err) => {
            error!("{err}");
            mbind::SETUP_FAILURE
        },
    }
}

fn print_bindings() {
    for binding in mbind::bindings().iter() {
        let keysym = xkb::keysym_get_name(binding.keysym);
        println!("{:<16} {:<24} {}", binding.mods.to_string(), keysym, binding.command.join(" "));
    }
}
