//! sixfive entry point.

use sixfive_base::Style;

fn main() {
    if let Err(e) = sixfive::cli::run_cli() {
        eprintln!("{}{}{}", Style::RED, e, Style::RESET);
        std::process::exit(1);
    }
}
