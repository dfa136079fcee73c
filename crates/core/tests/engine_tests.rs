use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lumen_core::{
    Animation, ArtNetConfig, ArtNetDriver, ChannelMap, DmxController, Driver, Loops, NullConfig,
    NullDriver, TransitionOptions, CHANNELS,
};

#[tokio::test(start_paused = true)]
async fn test_controller_drives_an_animated_universe() {
    let mut controller = DmxController::new();
    let driver: Arc<dyn Driver> = Arc::new(NullDriver::new(NullConfig { refresh_rate: 50.0 }));
    controller.add_universe("stage", driver).await.unwrap();

    controller.update_all("stage", 0);
    controller.update("stage", &ChannelMap::from([(1, 255), (5, 10)]));

    let snapshot = controller.get_universe("stage").unwrap();
    assert_eq!(snapshot.len(), CHANNELS);
    assert_eq!(snapshot[0], 255);
    assert_eq!(snapshot[4], 10);

    // untouched names never throw and touch nothing
    controller.update("backstage", &ChannelMap::from([(1, 1)]));
    assert_eq!(controller.get_universe("stage").unwrap()[0], 255);

    let finished = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finished);
    let handle = controller.driver("stage").unwrap();

    let mut animation = Animation::new();
    animation
        .add(
            ChannelMap::from([(1, 0)]),
            Duration::from_millis(100),
            TransitionOptions::default(),
        )
        .delay(Duration::from_millis(50));
    animation.run_loop(
        handle,
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
        Loops::Finite(2),
    );

    tokio::time::sleep(Duration::from_millis(320)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(controller.get_universe("stage").unwrap()[0], 0);
    // the delay transition never touched channel 5
    assert_eq!(controller.get_universe("stage").unwrap()[4], 10);

    controller.close().await;
    assert!(controller.get_universe("stage").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_artnet_driver_ships_frames_over_udp() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let dest_port = receiver.local_addr().unwrap().port();

    let driver = ArtNetDriver::new(ArtNetConfig {
        source_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        dest_ip: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        port: dest_port,
        universe: 1,
        send_interval_ms: 10,
    });
    driver.update(&ChannelMap::from([(1, 255), (512, 7)]));

    driver.connect().await.unwrap();
    driver.open().await.unwrap();

    let mut buf = [0u8; 1024];
    let (len, _) = receiver.recv_from(&mut buf).unwrap();

    // ArtDmx: 18-byte header followed by the 512 channel bytes
    assert_eq!(&buf[..8], b"Art-Net\0");
    assert_eq!(len, 18 + CHANNELS);
    assert_eq!(buf[18], 255);
    assert_eq!(buf[18 + 511], 7);

    driver.close().await.unwrap();
    driver.disconnect().await.unwrap();
}
