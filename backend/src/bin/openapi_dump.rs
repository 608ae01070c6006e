//! Print the OpenAPI document as JSON.

use std::io::Write;
use std::process::ExitCode;

use lms_backend::doc::ApiDoc;
use utoipa::OpenApi;

fn main() -> ExitCode {
    let json = match ApiDoc::openapi().to_pretty_json() {
        Ok(json) => json,
        Err(err) => {
            writeln!(std::io::stderr(), "failed to serialise OpenAPI document: {err}").ok();
            return ExitCode::FAILURE;
        }
    };
    match writeln!(std::io::stdout(), "{json}") {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
