mod cli;
mod config;
mod dispatch;
mod lifecycle;
mod logging;
mod runner;
mod templates;

fn main() {
    match cli::parse() {
        Ok(app) => {
            logging::init(app.verbose);
            runner::run(app);
        }
        Err(err) => {
            logging::init(0);
            cli::report_parse_error(&err);
        }
    }
}
