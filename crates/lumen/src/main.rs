use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use lumen_core::{
    Animation, ArtNetConfig, ArtNetDriver, ChannelMap, DmxController, Driver, Loops, NullConfig,
    NullDriver, SerialDriver, TransitionOptions,
};

/// Lumen DMX512 controller.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "Drive a DMX universe and run a demonstration chase")]
struct Args {
    /// Output driver
    #[arg(long, value_enum, default_value_t = DriverKind::Null)]
    driver: DriverKind,

    /// Serial port path (serial driver)
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Art-Net destination IP (art-net driver; broadcast when omitted)
    #[arg(long)]
    dest_ip: Option<IpAddr>,

    /// Art-Net port address (sub-net + universe)
    #[arg(long, default_value = "0")]
    universe: u16,

    /// Seconds to run before blacking out and closing
    #[arg(long, default_value = "10")]
    seconds: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DriverKind {
    Null,
    Serial,
    Artnet,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let driver: Arc<dyn Driver> = match args.driver {
        DriverKind::Null => Arc::new(NullDriver::new(NullConfig::default())),
        DriverKind::Serial => Arc::new(SerialDriver::enttec_open_dmx_usb(&args.port)),
        DriverKind::Artnet => Arc::new(ArtNetDriver::new(ArtNetConfig {
            dest_ip: args.dest_ip,
            universe: args.universe,
            ..ArtNetConfig::default()
        })),
    };

    let mut controller = DmxController::new();
    controller
        .add_universe("main", Arc::clone(&driver))
        .await?;
    log::info!("universe 'main' open on the {} driver", driver.id());

    // blank the universe, then breathe the first two channels until the
    // timer runs out
    controller.update_all("main", 0);

    let mut animation = Animation::new();
    animation
        .add(
            ChannelMap::from([(1, 255), (2, 128)]),
            Duration::from_millis(1500),
            TransitionOptions {
                easing: Some("in_out_sine".to_string()),
                ..Default::default()
            },
        )
        .delay(Duration::from_millis(500))
        .add(
            ChannelMap::from([(1, 0), (2, 0)]),
            Duration::from_millis(1500),
            TransitionOptions {
                easing: Some("out_quad".to_string()),
                ..Default::default()
            },
        );
    animation.run_loop(Arc::clone(&driver), None, Loops::Infinite);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("interrupted"),
        _ = tokio::time::sleep(Duration::from_secs(args.seconds)) => {}
    }

    animation.stop().await;
    controller.update_all("main", 0);
    // let the blackout frame ship before tearing the loop down
    tokio::time::sleep(driver.send_interval()).await;
    controller.close().await;

    Ok(())
}
