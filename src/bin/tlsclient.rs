//! Command-line front end: reads one request descriptor, prints one JSON
//! response document.
//!
//! ```text
//! tlsclient <descriptor.json | ->
//! tlsclient --list-profiles
//! tlsclient --version
//! ```

use std::io::{self, Read};
use std::process::ExitCode;

use tlsclient_rs::{NormalizedResponse, RequestDescriptor, SerializationError, TlsClient, VERSION};

const USAGE: &str = "usage: tlsclient <descriptor.json | -> | --list-profiles | --version";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(target) = args.first() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    if target == "--version" {
        println!("tlsclient {VERSION}");
        return ExitCode::SUCCESS;
    }

    let client = match TlsClient::new() {
        Ok(client) => client,
        Err(err) => return emit(&NormalizedResponse::failure(err.to_string())),
    };

    if target == "--list-profiles" {
        return match client.supported_profiles().to_json() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => fatal(err),
        };
    }

    let response = if target == "-" {
        match read_stdin().map(|input| RequestDescriptor::from_json(&input)) {
            Ok(Ok(descriptor)) => client.request(descriptor).await,
            Ok(Err(err)) => NormalizedResponse::failure(err.to_string()),
            Err(err) => NormalizedResponse::failure(format!("failed to read stdin: {err}")),
        }
    } else {
        client.request_from_file(target).await
    };

    emit(&response)
}

fn read_stdin() -> io::Result<String> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    Ok(input)
}

fn emit(response: &NormalizedResponse) -> ExitCode {
    match response.to_json() {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => fatal(err),
    }
}

fn fatal(err: SerializationError) -> ExitCode {
    eprintln!("tlsclient: {err}");
    ExitCode::FAILURE
}
