use clap::Parser;
use memory_palace::{audio, browse, cli, commands, config, controller, error, storage};
use audio::ConfiguredPlayer;
use cli::{Cli, Commands};
use config::Settings;
use controller::PalaceController;
use error::Result;
use std::process::ExitCode;
use storage::JsonFileStore;

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// 設定の作成・表示
fn run_config(cli: &Cli, init: bool, show: bool) -> Result<()> {
    if init {
        let path = Settings::init(cli.config.as_deref())?;
        println!("✔ 設定ファイルを作成: {}", path.display());
    }
    if show || !init {
        let settings = Settings::load(cli.config.as_deref())?;
        for line in settings.summary() {
            println!("{}", line);
        }
    }
    Ok(())
}

/// コマンドを実行し、成功したかを返す
///
/// 起動時の失敗（設定・保存領域）だけが `Err` になる。
async fn run(cli: Cli) -> Result<bool> {
    if let Commands::Config { init, show } = cli.command {
        run_config(&cli, init, show)?;
        return Ok(true);
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let store_dir = match &cli.store {
        Some(dir) => dir.clone(),
        None => JsonFileStore::default_dir()?,
    };
    let store = JsonFileStore::open(&store_dir)?;
    tracing::debug!("Using store {}", store.dir().display());

    let player = ConfiguredPlayer::from_config(settings.palace.audio.command.as_deref());
    let mut controller = PalaceController::new(settings.palace, Box::new(store));

    let fresh_load = matches!(cli.command, Commands::Load { .. } | Commands::Open { .. });
    if !fresh_load {
        if let Err(e) = controller.restore_session() {
            tracing::warn!("Unable to restore session: {}", e);
        }
    }

    let name = commands::command_name(&cli.command);
    let result = commands::execute(cli.command, &mut controller, &player).await;
    let succeeded = controller.settle(name, result).is_some();
    browse::print_notices(controller.take_notices());
    Ok(succeeded)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("✖ {}", e);
            ExitCode::FAILURE
        }
    }
}
