use std::path::PathBuf;

use log::{debug, info};
use tourdex::app_context::AppServices;
use tourdex::artist_filter::DEFAULT_SUGGESTION_LIMIT;
use tourdex::config_persistence;
use tourdex::filter_query::{decode_query_pairs, FilterQuery};

const USAGE: &str = "\
usage: tourdex [--config <path>] [--json] <command>

commands:
  filter [key=value ...]   filter artists (q, creation_min, creation_max,
                           members_min, members_max, first_album_min,
                           first_album_max, location); a single argument
                           may also be a raw query string
  suggest <prefix>         artist names starting with <prefix>
  artist <id>              tour dates, tour stops and map points
  locations                every selectable location filter";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Filter(Vec<(String, String)>),
    Suggest(String),
    Artist(u32),
    Locations,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    config_path: Option<PathBuf>,
    json: bool,
    command: Command,
}

fn parse_filter_args(args: &[String]) -> Vec<(String, String)> {
    args.iter()
        .flat_map(|arg| {
            if arg.contains('&') || arg.starts_with('?') {
                decode_query_pairs(arg)
            } else {
                let (key, value) = arg.split_once('=').unwrap_or((arg.as_str(), ""));
                vec![(key.to_string(), value.to_string())]
            }
        })
        .collect()
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut config_path = None;
    let mut json = false;
    let mut help = false;
    let mut rest = args.iter();
    let mut positional = Vec::new();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" => {
                let path = rest.next().ok_or("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
            }
            "--json" => json = true,
            "-h" | "--help" => help = true,
            _ => positional.push(arg.clone()),
        }
    }

    if help {
        return Ok(CliArgs {
            config_path,
            json,
            command: Command::Help,
        });
    }

    let Some((name, operands)) = positional.split_first() else {
        return Err(USAGE.to_string());
    };
    let command = match name.as_str() {
        "filter" => Command::Filter(parse_filter_args(operands)),
        "suggest" => Command::Suggest(operands.join(" ")),
        "artist" => {
            let id = operands
                .first()
                .and_then(|raw| raw.trim().parse::<u32>().ok())
                .ok_or("artist needs a numeric id")?;
            Command::Artist(id)
        }
        "locations" => Command::Locations,
        other => return Err(format!("unknown command '{other}'\n\n{USAGE}")),
    };
    Ok(CliArgs {
        config_path,
        json,
        command,
    })
}

fn run(
    services: &AppServices,
    command: Command,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Filter(pairs) => {
            let query = FilterQuery::from_pairs(pairs);
            if query.is_unconstrained() {
                debug!("No filters given; listing every artist");
            } else {
                debug!("Filter query: {:?}", query);
            }
            let listing = services.filtered_artists(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing.artists)?);
            } else {
                for artist in &listing.artists {
                    println!(
                        "{:>3}  {}  ({} members, formed {}, first album {})",
                        artist.id,
                        artist.name,
                        artist.member_count(),
                        artist.creation_date,
                        artist.first_album
                    );
                }
            }
            info!("{} artists matched", listing.artists.len());
        }
        Command::Suggest(prefix) => {
            let suggestions = services.suggestions(&prefix, DEFAULT_SUGGESTION_LIMIT)?;
            if json {
                println!("{}", serde_json::to_string(&suggestions)?);
            } else {
                for suggestion in suggestions {
                    println!("{:>3}  {}", suggestion.id, suggestion.name);
                }
            }
        }
        Command::Artist(artist_id) => {
            let Some(detail) = services.artist_detail(artist_id)? else {
                return Err(format!("no artist with id {artist_id}").into());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                println!(
                    "{} (formed {})",
                    detail.artist.name, detail.artist.creation_date
                );
                println!("members: {}", detail.artist.members.join(", "));
                println!("first album: {}", detail.artist.first_album);
                println!("dates: {}", detail.dates.join(", "));
                for location in &detail.locations {
                    println!("  stop: {location}");
                }
                for point in &detail.geo_points {
                    println!(
                        "  map: {} ({:.4}, {:.4})",
                        point.display_name, point.lat, point.lng
                    );
                }
            }
            debug!(
                "{} geocoded locations cached",
                services.geocoder.cached_len()
            );
        }
        Command::Locations => {
            let snapshot = services.snapshot()?;
            if json {
                println!("{}", serde_json::to_string(&snapshot.location_options)?);
            } else {
                for option in &snapshot.location_options {
                    println!("{option}");
                }
            }
        }
        Command::Help => println!("{USAGE}"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&raw_args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };
    if cli.command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Trace);
    clog.init();
    // Narrowed again once the config (which carries the level) is loaded.
    log::set_max_level(log::LevelFilter::Info);

    let config = config_persistence::load_runtime_config(cli.config_path.as_deref());
    log::set_max_level(config.logging.level.to_level_filter());

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    debug!("Upstream catalog: {}", config.upstream.base_url);
    let services = AppServices::from_config(&config);
    run(&services, cli.command, cli.json)
}
