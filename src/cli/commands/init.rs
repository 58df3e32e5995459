use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    let path = Config::default_config_path();

    if Config::create_default_if_missing()? {
        println!("Created default config at {}", path.display());
        println!(
            "Add feed URLs under [feeds] and shows under [[shows]], then run 'showfeed check'."
        );
    } else {
        println!("Config already exists at {}", path.display());
    }

    Ok(())
}
