use clap::{crate_version, App, Arg};
use log::{error, info, LevelFilter};
use pilcrow::build::build_site;
use simple_logger::SimpleLogger;
use std::path::Path;

fn main() {
    let matches = App::new("pilcrow")
        .version(crate_version!())
        .about("Builds a static blog from a directory of markdown documents")
        .arg(
            Arg::with_name("SITE_PATH")
                .help("The site directory (containing site.yml)")
                .default_value(".")
                .index(1),
        )
        .arg(
            Arg::with_name("clean")
                .short("x")
                .long("clean")
                .help("Remove the deploy directory before building"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log debug output"),
        )
        .get_matches();

    let level = match matches.is_present("verbose") {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };
    if let Err(err) = SimpleLogger::new().with_level(level).init() {
        eprintln!("initializing logger: {}", err);
    }

    let path = Path::new(matches.value_of("SITE_PATH").unwrap_or("."));
    match build_site(path, matches.is_present("clean")) {
        Ok(stats) => info!(
            "built {} pages, {} static files, {} feed entries",
            stats.pages, stats.files, stats.feed_entries
        ),
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    }
}
