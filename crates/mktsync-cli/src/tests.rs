use super::*;
use mktsync_core::Vendor;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["mktsync-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["mktsync-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_db_seed_with_path() {
    let cli = Cli::try_parse_from(["mktsync-cli", "db", "seed", "--path", "config/other.yaml"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed { path: Some(ref p) }
        }) if p.ends_with("other.yaml")
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["mktsync-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn sync_run_defaults_to_full_vendor_plan() {
    let cli = Cli::try_parse_from(["mktsync-cli", "sync", "run", "--vendor", "lazada"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sync {
            command: SyncCommands::Run {
                vendor: Vendor::Lazada,
                entity: None,
                tenant: None,
                max_pages: None,
                dry_run: false,
            }
        })
    ));
}

#[test]
fn sync_run_accepts_kebab_case_vendor_and_filters() {
    let cli = Cli::try_parse_from([
        "mktsync-cli",
        "sync",
        "run",
        "--vendor",
        "tiktok-shop",
        "--entity",
        "order",
        "--tenant",
        "tts-vn",
        "--max-pages",
        "5",
        "--dry-run",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sync {
            command: SyncCommands::Run {
                vendor: Vendor::TiktokShop,
                entity: Some(ref e),
                tenant: Some(ref t),
                max_pages: Some(5),
                dry_run: true,
            }
        }) if e == "order" && t == "tts-vn"
    ));
}

#[test]
fn sync_run_requires_vendor() {
    assert!(Cli::try_parse_from(["mktsync-cli", "sync", "run"]).is_err());
}

#[test]
fn sync_run_rejects_unknown_vendor() {
    assert!(Cli::try_parse_from(["mktsync-cli", "sync", "run", "--vendor", "shopee"]).is_err());
}

#[test]
fn runs_list_default_limit() {
    let cli = Cli::try_parse_from(["mktsync-cli", "runs", "list"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Runs {
            command: RunsCommands::List { limit: 20 }
        })
    ));
}

#[test]
fn runs_show_requires_id() {
    assert!(Cli::try_parse_from(["mktsync-cli", "runs", "show"]).is_err());
    let cli = Cli::try_parse_from(["mktsync-cli", "runs", "show", "--id", "42"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Runs {
            command: RunsCommands::Show { id: 42 }
        })
    ));
}

#[test]
fn auth_url_requires_tenant() {
    assert!(Cli::try_parse_from(["mktsync-cli", "auth", "url"]).is_err());
    let cli = Cli::try_parse_from(["mktsync-cli", "auth", "url", "--tenant", "lzd-vn"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Auth {
            command: AuthCommands::Url { ref tenant }
        }) if tenant == "lzd-vn"
    ));
}

#[test]
fn auth_refresh_defaults_to_all_tenants() {
    let cli = Cli::try_parse_from(["mktsync-cli", "auth", "refresh"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Auth {
            command: AuthCommands::Refresh {
                tenant: None,
                force: false
            }
        })
    ));
}
