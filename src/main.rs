mod config;
mod dll;
mod error;
mod install;
mod paths;
mod process;
mod sandbox;
mod util;

use serde::Serialize;

use crate::config::GameProfile;
use crate::error::{Error, MutationOutcome, Result};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|arg| arg == "--help") {
        println!("{}", USAGE_TEXT);
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("[lsfgctl] error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let mut rest = args.iter().map(String::as_str);

    match rest.next() {
        Some("status") => cmd_status(),
        Some("install") => cmd_install(rest.next()),
        Some("uninstall") => {
            print_json(&install::uninstall());
            Ok(())
        }
        Some("config") => cmd_config(rest.next(), rest.next(), rest.next()),
        Some("profile") => cmd_profile(rest.next(), rest.next(), rest.next(), rest.next()),
        Some("resolve") => cmd_resolve(rest.next()),
        Some("dll") => {
            print_json(&dll::stats());
            Ok(())
        }
        Some("sandbox") => cmd_sandbox(rest.next(), rest.next()),
        Some("processes") => {
            let processes = process::list_processes()?;
            print_json(&process::filter_relevant(&processes));
            Ok(())
        }
        Some("last-launch") => {
            print_json(&process::last_launch()?);
            Ok(())
        }
        Some(other) => {
            eprintln!("[lsfgctl] unknown command: {other}");
            eprintln!("{}", USAGE_TEXT);
            std::process::exit(2);
        }
        None => unreachable!(),
    }
}

/// Everything the shell needs in one query: what is installed, with what
/// config, running what.
#[derive(Serialize)]
struct Status {
    installation: install::InstallationStatus,
    dll: dll::DllStats,
    sandbox: Vec<sandbox::SandboxAppStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_launch: Option<process::LastLaunch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_error: Option<String>,
}

fn cmd_status() -> Result<()> {
    let (active_profile, config_error) = match config::load() {
        Ok(cfg) => {
            let processes = process::list_processes().unwrap_or_default();
            (process::active_profile(&cfg, &processes), None)
        }
        Err(e) => (None, Some(e.to_string())),
    };

    print_json(&Status {
        installation: install::probe(),
        dll: dll::stats(),
        sandbox: sandbox::status_all(),
        last_launch: process::last_launch().unwrap_or(None),
        active_profile,
        config_error,
    });
    Ok(())
}

fn cmd_install(source: Option<&str>) -> Result<()> {
    let source = source.ok_or_else(|| {
        Error::NotFound("install requires the path to the layer library".to_string())
    })?;

    let cfg = config::load()?;
    let outcome = install::install(std::path::Path::new(source), &cfg)?;
    print_json(&outcome);
    Ok(())
}

fn cmd_config(action: Option<&str>, field: Option<&str>, value: Option<&str>) -> Result<()> {
    match action {
        Some("get") | None => {
            let mut cfg = config::load()?;
            // Surface a detected DLL path in the returned document without
            // persisting it; the user may still point at a different copy.
            if cfg.global.dll.is_empty()
                && let Some(path) = dll::locate().path
            {
                cfg.global.dll = path.display().to_string();
            }
            print_json(&cfg);
            Ok(())
        }
        Some("set") => {
            let (field, value) = require_field_value(field, value)?;
            let mut cfg = config::load()?;
            set_config_field(&mut cfg, field, value)?;
            config::save(&cfg)?;
            print_json(&MutationOutcome::ok(format!("set {field} = {value}")));
            Ok(())
        }
        Some(other) => Err(Error::NotFound(format!("unknown config action: {other}"))),
    }
}

fn set_config_field(cfg: &mut config::Config, field: &str, value: &str) -> Result<()> {
    match field {
        "dll" => cfg.global.dll = value.to_string(),
        "multiplier" => cfg.global.multiplier = parse_value(field, value)?,
        "flow_scale" => cfg.global.flow_scale = parse_value(field, value)?,
        "performance_mode" => cfg.global.performance_mode = parse_value(field, value)?,
        "hdr_mode" => cfg.global.hdr_mode = parse_value(field, value)?,
        "experimental_present_mode" => {
            cfg.global.experimental_present_mode = value.to_string()
        }
        "log_level" => cfg.global.log_level = value.to_string(),
        "per_game_profiles" => cfg.global.per_game_profiles = parse_value(field, value)?,
        "dxvk_frame_rate" => cfg.script.dxvk_frame_rate = parse_value(field, value)?,
        "enable_wow64" => cfg.script.enable_wow64 = parse_value(field, value)?,
        "disable_steamdeck_mode" => {
            cfg.script.disable_steamdeck_mode = parse_value(field, value)?
        }
        other => {
            return Err(Error::InvalidConfig(format!("unknown field: {other}")));
        }
    }
    Ok(())
}

fn cmd_profile(
    action: Option<&str>,
    key: Option<&str>,
    field: Option<&str>,
    value: Option<&str>,
) -> Result<()> {
    match action {
        Some("list") | None => {
            print_json(&config::load()?.profile_keys());
            Ok(())
        }
        Some("get") => {
            let key = require_key(key)?;
            let cfg = config::load()?;
            match cfg.profile(key) {
                Some(profile) => print_json(profile),
                None => {
                    return Err(Error::NotFound(format!("no profile for {key}")));
                }
            }
            Ok(())
        }
        Some("set") => {
            let key = require_key(key)?;
            let (field, value) = require_field_value(field, value)?;

            let mut cfg = config::load()?;
            let mut profile = cfg
                .profile(key)
                .cloned()
                .unwrap_or_else(|| GameProfile {
                    exe: key.to_string(),
                    ..Default::default()
                });
            set_profile_field(&mut profile, field, value)?;
            cfg.set_profile(profile);
            config::save(&cfg)?;

            print_json(&MutationOutcome::ok(format!("set {key}: {field} = {value}")));
            Ok(())
        }
        Some("remove") => {
            let key = require_key(key)?;
            let mut cfg = config::load()?;
            if !cfg.remove_profile(key) {
                print_json(&MutationOutcome::ok(format!("no profile for {key}; nothing to do")));
                return Ok(());
            }
            config::save(&cfg)?;
            print_json(&MutationOutcome::ok(format!("removed profile {key}")));
            Ok(())
        }
        Some(other) => Err(Error::NotFound(format!("unknown profile action: {other}"))),
    }
}

fn set_profile_field(profile: &mut GameProfile, field: &str, value: &str) -> Result<()> {
    // "unset" clears an override so the field inherits the global value again
    let unset = value == "unset";
    match field {
        "multiplier" => {
            profile.multiplier = if unset { None } else { Some(parse_value(field, value)?) }
        }
        "flow_scale" => {
            profile.flow_scale = if unset { None } else { Some(parse_value(field, value)?) }
        }
        "performance_mode" => {
            profile.performance_mode = if unset { None } else { Some(parse_value(field, value)?) }
        }
        "hdr_mode" => {
            profile.hdr_mode = if unset { None } else { Some(parse_value(field, value)?) }
        }
        "experimental_present_mode" => {
            profile.experimental_present_mode = if unset { None } else { Some(value.to_string()) }
        }
        other => {
            return Err(Error::InvalidConfig(format!("unknown profile field: {other}")));
        }
    }
    Ok(())
}

fn cmd_resolve(key: Option<&str>) -> Result<()> {
    let key = require_key(key)?;
    print_json(&config::load()?.resolve(key));
    Ok(())
}

fn cmd_sandbox(action: Option<&str>, target: Option<&str>) -> Result<()> {
    match action {
        Some("status") | None => {
            print_json(&sandbox::status_all());
            Ok(())
        }
        Some("apply") => match target {
            Some("--all") | None => {
                print_json(&sandbox::apply_all());
                Ok(())
            }
            Some(id) => {
                let app = lookup_app(id)?;
                print_json(&sandbox::apply(app)?);
                Ok(())
            }
        },
        Some("remove") => match target {
            Some("--all") | None => {
                print_json(&sandbox::remove_all());
                Ok(())
            }
            Some(id) => {
                let app = lookup_app(id)?;
                print_json(&sandbox::remove(app)?);
                Ok(())
            }
        },
        Some(other) => Err(Error::NotFound(format!("unknown sandbox action: {other}"))),
    }
}

fn lookup_app(id: &str) -> Result<&'static sandbox::SandboxApp> {
    sandbox::find_app(id)
        .ok_or_else(|| Error::NotFound(format!("unsupported application id: {id}")))
}

fn require_key(key: Option<&str>) -> Result<&str> {
    key.ok_or_else(|| Error::NotFound("missing profile key".to_string()))
}

fn require_field_value<'a>(
    field: Option<&'a str>,
    value: Option<&'a str>,
) -> Result<(&'a str, &'a str)> {
    match (field, value) {
        (Some(f), Some(v)) => Ok((f, v)),
        _ => Err(Error::InvalidConfig("expected <field> <value>".to_string())),
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid value for {field}: {value:?}")))
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap());
}

static USAGE_TEXT: &str = r#"
Usage: lsfgctl <COMMAND>

Commands:
    status                                Installation, DLL, sandbox and process snapshot
    install <liblsfg-vk.so>               Install the layer from a built library file
    uninstall                             Remove the user-local install
    config [get]                          Print the configuration document
    config set <field> <value>            Update one global or script field
    profile [list]                        List per-game profile keys
    profile get <key>                     Print one per-game profile
    profile set <key> <field> <value>     Set a per-game override ("unset" clears it)
    profile remove <key>                  Delete a per-game profile
    resolve <key>                         Print the effective settings for a game
    dll                                   Locate and fingerprint the payload DLL
    sandbox [status]                      Per-application sandbox state
    sandbox apply [<app-id>|--all]        Grant overrides and create symlinks
    sandbox remove [<app-id>|--all]       Revoke overrides and delete symlinks
    processes                             Relevant running processes
    last-launch                           Most recent wrapper-recorded launch
"#;
