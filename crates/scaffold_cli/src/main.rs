//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire settings, logging, database and one service call end to end.
//! - Keep output deterministic for quick local sanity checks.

use scaffold_core::db::{open_db, open_db_in_memory};
use scaffold_core::{
    init_logging, DatabaseLocation, ErrorResponse, Session, Settings, ShopService, UserCreate,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("settings error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let logging = match init_logging(settings.log_mode, settings.log_dir.as_deref()) {
        Ok(context) => context,
        Err(err) => {
            eprintln!("logging error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let code = run(&settings);
    logging.shutdown();
    code
}

fn run(settings: &Settings) -> ExitCode {
    let opened = match &settings.database {
        DatabaseLocation::InMemory => open_db_in_memory(),
        DatabaseLocation::File(path) => open_db(path),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{} core_version={} api_prefix={}",
        settings.project_name,
        scaffold_core::core_version(),
        settings.api_prefix()
    );

    let mut session = Session::new(&conn);
    let owner = UserCreate::new("owner@example.com").with_full_name("Demo Owner");
    match ShopService::new().open_with_owner(&mut session, &owner, "demo shop") {
        Ok((user, shop)) => {
            println!("user id={:?} email={}", user.id, user.email);
            println!("shop id={:?} name={}", shop.id, shop.name);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let response = ErrorResponse::from(&err);
            println!("status={} body={}", response.status, response.body);
            ExitCode::FAILURE
        }
    }
}
