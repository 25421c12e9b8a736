pub mod app_error;
pub mod cases;
pub mod cli;
pub mod client;
pub mod config;
pub mod model;
pub mod output;
pub mod publisher;
pub mod report;
pub mod version;

pub fn run() -> i32 {
    match cli::run_cli() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            err.code()
        }
    }
}
