use std::env;

use growlog_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::{
    default_config_path, CliProfilesConfig, SUPABASE_ANON_KEY_ENV, SUPABASE_URL_ENV, TABLE_ENV,
};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            table,
            no_activate,
        } => run_config_init(
            global_profile,
            supabase_url,
            supabase_anon_key,
            table,
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    table: Option<String>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let supabase_url = normalize_text_option(supabase_url)
        .or_else(|| normalize_text_option(env::var(SUPABASE_URL_ENV).ok()));
    let supabase_anon_key = normalize_text_option(supabase_anon_key)
        .or_else(|| normalize_text_option(env::var(SUPABASE_ANON_KEY_ENV).ok()));
    let table =
        normalize_text_option(table).or_else(|| normalize_text_option(env::var(TABLE_ENV).ok()));

    apply_profile_update(
        &mut config,
        &profile_name,
        ProfileUpdate {
            supabase_url,
            supabase_anon_key,
            table,
        },
        !no_activate,
    )?;

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let ready = config.profile(&profile_name).is_some_and(|profile| {
        profile.supabase_url.is_some() && profile.supabase_anon_key.is_some()
    });
    if ready {
        println!(
            "Sync profile '{profile_name}' is ready. Run `growlog auth login --email <email> --password <password>`."
        );
    } else {
        println!("Profile '{profile_name}' is missing: supabase_url, supabase_anon_key");
    }
    Ok(())
}

/// Values given to `config init`; `None` keeps what the profile has
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub table: Option<String>,
}

/// Merge `update` into `profile_name`, rejecting a profile whose remote
/// settings would not resolve.
pub fn apply_profile_update(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    update: ProfileUpdate,
    activate: bool,
) -> Result<(), CliError> {
    let mut profile = config.profile(profile_name).cloned().unwrap_or_default();
    if let Some(value) = update.supabase_url {
        profile.supabase_url = Some(value.trim_end_matches('/').to_string());
    }
    if let Some(value) = update.supabase_anon_key {
        profile.supabase_anon_key = Some(value);
    }
    if let Some(value) = update.table {
        profile.table = Some(value);
    }

    profile.remote_config(|_| None).map_err(CliError::Config)?;

    *config.profile_mut_or_default(profile_name) = profile;
    if activate {
        config.active_profile = Some(profile_name.to_string());
    }
    Ok(())
}

pub fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let path = default_config_path().map_err(CliError::Config)?;

    println!("Config file: {}", path.display());
    println!("Profile: {profile_name}");

    let remote = config
        .profile(&profile_name)
        .cloned()
        .unwrap_or_default()
        .remote_config(|name| env::var(name).ok())
        .map_err(CliError::Config)?;
    match remote {
        Some(remote) => {
            println!("Supabase URL: {}", remote.supabase_url);
            println!("Anon key: {}", redact_key(&remote.supabase_anon_key));
            println!("Table: {}", remote.table);
        }
        None => println!("Sync: not configured"),
    }
    Ok(())
}

pub fn redact_key(key: &str) -> String {
    let visible = key.chars().take(6).collect::<String>();
    if key.chars().count() <= 6 {
        "***".to_string()
    } else {
        format!("{visible}***")
    }
}
