use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("webmsg {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: webmsg");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("WEBMSG_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: http={}, async={}, cli=true",
        cfg!(feature = "http"),
        cfg!(feature = "async")
    );
    println!(
        "defaults: base_path={}, keep_alive={:?}, restart_delay={:?}",
        webmsg_wire::DEFAULT_BASE_PATH,
        webmsg_session::DEFAULT_KEEP_ALIVE_PERIOD,
        webmsg_session::DEFAULT_RESTART_DELAY
    );

    Ok(SUCCESS)
}
