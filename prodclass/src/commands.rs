use crate::CLAP_STYLING;
use clap::{ArgGroup, arg, command};
use prodclass_client::client::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("prodclass")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("prodclass")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log request lifecycle details to stderr").required(false))
        .subcommand_required(false)
        .subcommand(
            service_args(command!("classify"))
                .about("Classify one product page, or every URL listed in a file")
                .arg(
                    arg!([URL])
                        .required(false)
                        .help("The product page URL to classify"),
                )
                .arg(
                    arg!(-U --"urls-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of product URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .group(
                    ArgGroup::new("input")
                        .args(["URL", "urls-file"])
                        .required(true)
                        .multiple(false),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown", "md"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            service_args(command!("interactive"))
                .about("Start a session that classifies each URL you type"),
        )
}

fn service_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-e --"endpoint" <URL>)
            .required(false)
            .help("Base URL of the classification service")
            .value_parser(clap::value_parser!(Url))
            .default_value(DEFAULT_ENDPOINT),
    )
    .arg(
        arg!(-t --"timeout" <SECONDS>)
            .required(false)
            .help(format!(
                "Request timeout in seconds [default: {}]",
                DEFAULT_TIMEOUT_SECS
            ))
            .value_parser(clap::value_parser!(u64).range(1..)),
    )
}
