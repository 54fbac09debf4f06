use memorial_grounds::cli::CliOverrides;
use memorial_grounds::config::AppConfig;

const CONFIG_PATH: &str = "config/app.json";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let overrides = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed.into_config_overrides(),
        Err(err) => {
            eprintln!("[cli] {err:#}");
            std::process::exit(2);
        }
    };
    let mut config = AppConfig::load_or_default(CONFIG_PATH);
    if !overrides.is_empty() {
        log::info!("command line overrides: {}", overrides.applied_fields().join(", "));
        config.apply_overrides(&overrides);
    }
    if let Err(err) = memorial_grounds::run(config) {
        log::error!("application error: {err:?}");
        std::process::exit(1);
    }
}
