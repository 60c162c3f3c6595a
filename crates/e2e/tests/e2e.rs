//! E2E test harness entry point
//!
//! Drives the topology GUI in a real browser. Needs a WebDriver server,
//! the GUI, the controller REST API and the emulator control process, so
//! it only runs when `TOPOGUI_E2E=1` is set.
//!
//! Run with: TOPOGUI_E2E=1 cargo test --package topogui-e2e --test e2e -- --scenario connected

use std::path::PathBuf;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use topogui_common::{BrowserKind, CenterFormula, HarnessConfig, VERSION};
use topogui_e2e::runner::{self, RunnerConfig};
use topogui_e2e::scenarios;
use topogui_e2e::{E2eResult, TestRunner};

const ENABLE_VAR: &str = "TOPOGUI_E2E";

#[derive(Parser, Debug)]
#[command(name = "topogui-e2e")]
#[command(about = "E2E test runner for the topology GUI")]
struct Args {
    /// Harness configuration file (TOML)
    #[arg(short, long, env = "TOPOGUI_CONFIG")]
    config: Option<PathBuf>,

    /// Run only these scenarios (repeatable)
    #[arg(short, long)]
    scenario: Vec<String>,

    /// Leave these scenarios out (repeatable)
    #[arg(long)]
    skip: Vec<String>,

    /// List scenarios and exit
    #[arg(long)]
    list: bool,

    /// GUI address (host:port)
    #[arg(long)]
    gui_host: Option<String>,

    #[arg(long)]
    gui_port: Option<u16>,

    /// Controller REST API address
    #[arg(long)]
    rest_host: Option<String>,

    #[arg(long)]
    rest_port: Option<u16>,

    /// OpenFlow controller the emulated switches connect to
    #[arg(long)]
    controller_host: Option<String>,

    #[arg(long)]
    controller_port: Option<u16>,

    /// Emulator XML-RPC control address
    #[arg(long)]
    emulator_host: Option<String>,

    #[arg(long)]
    emulator_port: Option<u16>,

    /// WebDriver server URL
    #[arg(long, env = "WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Browser to use (chrome, firefox)
    #[arg(long)]
    browser: Option<BrowserKind>,

    /// Run in headless mode
    #[arg(long)]
    headless: Option<bool>,

    /// Poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Default poll attempt budget
    #[arg(long)]
    poll_attempts: Option<u32>,

    /// Use the legacy switch center formula for layout checks
    #[arg(long)]
    legacy_center: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,
}

impl Args {
    fn harness_config(&self) -> E2eResult<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };

        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut config.gui.host, &self.gui_host);
        set(&mut config.gui.port, &self.gui_port);
        set(&mut config.rest.host, &self.rest_host);
        set(&mut config.rest.port, &self.rest_port);
        set(&mut config.controller.host, &self.controller_host);
        set(&mut config.controller.port, &self.controller_port);
        set(&mut config.emulator.host, &self.emulator_host);
        set(&mut config.emulator.port, &self.emulator_port);
        set(&mut config.browser.webdriver_url, &self.webdriver_url);
        set(&mut config.browser.kind, &self.browser);
        set(&mut config.browser.headless, &self.headless);
        set(&mut config.poll.interval_ms, &self.poll_interval_ms);
        set(&mut config.poll.default_attempts, &self.poll_attempts);
        if self.legacy_center {
            config.layout.center_formula = CenterFormula::Legacy;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    if std::env::var(ENABLE_VAR).map(|v| v != "1").unwrap_or(true) {
        println!("skipping GUI scenarios: set {}=1 to run them", ENABLE_VAR);
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.list {
        for scenario in scenarios::all() {
            println!("{:<22} {}", scenario.name, scenario.description);
        }
        return;
    }

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    tracing::info!("topogui-e2e {}", VERSION);

    let config = RunnerConfig {
        harness: args.harness_config()?,
        only: args.scenario.clone(),
        skip: args.skip.clone(),
        output_dir: args.output.clone(),
    };

    // Fail on unknown names before a browser is started.
    runner::select(&config.only, &config.skip)?;

    let mut runner = TestRunner::start(&config).await?;
    let results = runner.run_selected(&config.only, &config.skip).await;

    if let Err(e) = runner.shutdown().await {
        error!("Closing browser session failed: {}", e);
    }

    let results = results?;
    runner::write_results(&config.output_dir, &results)?;

    Ok(results.success())
}
