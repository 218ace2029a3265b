use anyhow::Result;
use chrono::Utc;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use quire::build::{build_site, load_posts};
use quire::config::Config;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let project_arg = Arg::with_name("PROJECT_DIR")
        .help("The project directory, or any directory below it (default: .)")
        .index(1);
    let drafts_arg = Arg::with_name("drafts")
        .long("drafts")
        .help("Include posts marked `draft: true`");

    let matches = App::new("quire")
        .about("Builds a static blog from markdown posts")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site")
                .arg(project_arg.clone())
                .arg(drafts_arg.clone())
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .help("The output directory (default: `_site` in the project)"),
                ),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Lists published posts, newest first, with their paths")
                .arg(project_arg)
                .arg(drafts_arg),
        )
        .get_matches();

    match matches.subcommand() {
        ("build", Some(m)) => {
            let output = m.value_of("output").map(PathBuf::from);
            let config = load_config(m, output.as_deref())?;
            build_site(&config, Utc::now())?;
        }
        ("list", Some(m)) => {
            let config = load_config(m, None)?;
            for post in load_posts(&config, Utc::now())? {
                println!(
                    "{}  {}  {}",
                    post.effective_date().format("%Y-%m-%d"),
                    post.path,
                    post.data.title
                );
            }
        }
        _ => unreachable!("clap requires a subcommand"),
    }
    Ok(())
}

fn load_config(matches: &ArgMatches, output: Option<&Path>) -> Result<Config> {
    let dir = Path::new(matches.value_of("PROJECT_DIR").unwrap_or("."));
    let mut config = Config::from_directory(&dir.canonicalize()?, output)?;
    if matches.is_present("drafts") {
        config.show_drafts = true;
    }
    Ok(config)
}
