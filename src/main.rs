// 巡逻排班命令行工具
//
// Usage:
//   patrol-roster [--config FILE] months
//   patrol-roster [--config FILE] crew
//   patrol-roster [--config FILE] vessels <KAT>
//   patrol-roster [--config FILE] roles <KAT>
//   patrol-roster [--config FILE] eligible <KAT> <ROLE> <FROM> <TO>
//   patrol-roster [--config FILE] commit <KAT> <HULL> <FROM> <TO> <ROLE=NAME>...
//
// Dates are YYYY-MM-DD.

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use patrol_roster::api::{candidate_names, ApiError, PatrolApi};
use patrol_roster::app::get_default_source_path;
use patrol_roster::config::AppConfig;
use patrol_roster::domain::DomainError;
use patrol_roster::{i18n, logging, AppState, DateRange};
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "usage: patrol-roster [--config FILE] <months|crew|vessels KAT|roles KAT|eligible KAT ROLE FROM TO|commit KAT HULL FROM TO ROLE=NAME...>";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ApiError>() {
                Some(api_err) => eprintln!("{}", api_err.user_message()),
                None => eprintln!("{:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            bail!(USAGE);
        }
        config_path = Some(PathBuf::from(args.remove(1)));
        args.remove(0);
    }

    let mut config = AppConfig::resolve(config_path.as_deref()).context("读取配置失败")?;
    if config.log_json {
        logging::init_json(&config.log_filter);
    } else {
        logging::init(&config.log_filter);
    }
    if config.source_path.is_none() {
        config.source_path = get_default_source_path();
    }
    i18n::set_locale(&config.locale);

    let Some(command) = args.first().cloned() else {
        bail!(USAGE);
    };
    let rest = &args[1..];

    let state = AppState::new(config)?;
    let api = state.patrol_api.clone();
    let result = dispatch(&api, &command, rest).await;
    state.shutdown();
    result
}

async fn dispatch(api: &PatrolApi, command: &str, rest: &[String]) -> anyhow::Result<()> {
    match (command, rest) {
        ("months", []) => {
            for month in api.available_months().await? {
                println!("{}", month);
            }
        }
        ("crew", []) => {
            for member in api.list_crew().await? {
                println!("{:>4}  {}", member.id(), member.name());
            }
        }
        ("vessels", [category]) => {
            for vessel in api.list_vessels(category).await? {
                println!("{}", vessel.label());
            }
        }
        ("roles", [category]) => {
            for role in api.list_roles(category).await? {
                println!("{}", role.role());
            }
        }
        ("eligible", [category, role, from, to]) => {
            let range = parse_range(from, to)?;
            let outcome = api
                .find_eligible(category, role, range, &HashSet::new())
                .await?;
            let names = candidate_names(&outcome).ok_or(ApiError::Cancelled)?;
            if names.is_empty() {
                println!("{}", i18n::t("common.no_candidates"));
            }
            for name in names {
                println!("{}", name);
            }
        }
        ("commit", [category, hull, from, to, assignments @ ..]) if !assignments.is_empty() => {
            let range = parse_range(from, to)?;
            let mut draft = api.new_draft(range, category, hull).await?;
            for assignment in assignments {
                let (role, name) = assignment
                    .split_once('=')
                    .ok_or_else(|| anyhow!("expected ROLE=NAME, got {:?}", assignment))?;
                api.assign_by_name(&mut draft, role, name).await?;
            }

            let preview = api.preview(&draft)?;
            println!("{}", serde_json::to_string_pretty(&preview)?);

            let receipt = api.commit_draft(&draft).await?;
            let cells = receipt.cells_written.to_string();
            println!("{}", i18n::t_with_args("commit.saved", &[("cells", &cells)]));
            println!("{}", receipt.id);
        }
        _ => bail!(USAGE),
    }
    Ok(())
}

fn parse_range(from: &str, to: &str) -> anyhow::Result<DateRange> {
    let start = parse_date(from)?;
    let end = parse_date(to)?;
    Ok(DateRange::new(start, end).map_err(ApiError::from)?)
}

fn parse_date(text: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::from(DomainError::InvalidDate(text.trim().to_string())).into())
}
