use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use acuity_core::config::{SCREEN_HEIGHT, SCREEN_WIDTH};
use acuity_core::graphics::{self, ICON_SIZE};
use acuity_core::{
    Bitmap, Button, ButtonInput, Device, Error, HardwareError, MainMenu, ManualClock, MenuConfig,
    MenuHardware, MenuStateId, MockBluetooth, MockButtons, MockDisplay, MockVolume,
    SharedDisplay,
};

struct Bench {
    menu: MainMenu,
    buttons: MockButtons,
    bluetooth: MockBluetooth,
    display: MockDisplay,
    volume: MockVolume,
    clock: ManualClock,
}

fn devices() -> Vec<Device> {
    vec![
        Device::new("phone", "AA"),
        Device::new("speaker", "BB"),
        Device::new("headset", "CC"),
    ]
}

fn bench_with(bluetooth: MockBluetooth, config: MenuConfig) -> Bench {
    let buttons = MockButtons::default();
    let display = MockDisplay::new();
    let volume = MockVolume::new(35);
    let clock = ManualClock::new();
    let hardware = MenuHardware {
        display: SharedDisplay::new(display.clone()),
        buttons: Box::new(buttons.clone()),
        bluetooth: Arc::new(bluetooth.clone()),
        volume: Arc::new(volume.clone()),
        clock: Arc::new(clock.clone()),
    };
    let menu = MainMenu::new(hardware, || MenuStateId::Root, config).unwrap();
    Bench {
        menu,
        buttons,
        bluetooth,
        display,
        volume,
        clock,
    }
}

/// Bench whose default headphone "AA" connects at startup.
fn connected_bench() -> Bench {
    let bluetooth = MockBluetooth::new(devices());
    bluetooth.set_reachable(&["AA", "BB"]);
    let config = MenuConfig {
        default_headphone: "AA".to_string(),
        ..MenuConfig::default()
    };
    bench_with(bluetooth, config)
}

/// Bench with no connected device.
fn disconnected_bench() -> Bench {
    let bluetooth = MockBluetooth::new(devices());
    bluetooth.set_reachable(&["AA", "BB"]);
    bench_with(bluetooth, MenuConfig::default())
}

fn press(bench: &mut Bench, button: Button) {
    bench.buttons.push(button);
    bench.menu.tick().unwrap();
}

#[test]
fn test_default_headphone_connects_at_startup() {
    let bench = connected_bench();
    let snapshot = bench.menu.snapshot();

    assert_eq!(snapshot.connected, Some(Device::new("default", "AA")));
    assert_eq!(snapshot.current, MenuStateId::Root);
    assert_eq!(snapshot.bluetooth_titles, vec!["phone", "speaker", "headset"]);
    assert_eq!(bench.bluetooth.list_calls(), 1);
}

#[test]
fn test_disconnected_forces_bluetooth_icon() {
    let mut bench = disconnected_bench();

    press(&mut bench, Button::Up);

    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.current, MenuStateId::Root);
    assert!(snapshot.root_arrows_hidden);
    assert_eq!(snapshot.root_index, 0);

    // The next tick snaps the selection back to the Bluetooth icon.
    bench.buttons.push(Button::Confirm);
    bench.menu.tick().unwrap();
    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.root_index, 1);
    assert_eq!(snapshot.next, MenuStateId::Bluetooth);
}

/// The root icon as placed by the one-row icon layout.
fn root_icon(frame: &Bitmap) -> Bitmap {
    let left = (SCREEN_WIDTH - ICON_SIZE) / 2;
    let top = (SCREEN_HEIGHT - ICON_SIZE) / 2;
    let mut icon = Bitmap::new(ICON_SIZE, ICON_SIZE);
    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            icon.set(x, y, frame.get(left + x, top + y));
        }
    }
    icon
}

#[test]
fn test_bluetooth_icon_shows_connection_status() {
    let mut bench = disconnected_bench();
    let crossed = graphics::cross(graphics::bluetooth_icon());
    let checked = graphics::check(graphics::bluetooth_icon());

    press(&mut bench, Button::Confirm);
    assert_eq!(root_icon(&bench.display.last_frame().unwrap()), crossed);

    // Connect to "phone", then come back to root.
    press(&mut bench, Button::Confirm);
    assert!(bench.menu.snapshot().connected.is_some());
    press(&mut bench, Button::Up);
    assert_eq!(bench.menu.snapshot().current, MenuStateId::Root);
    assert_eq!(root_icon(&bench.display.last_frame().unwrap()), checked);
}

#[test]
fn test_other_root_icons_keep_their_glyph() {
    let mut bench = connected_bench();

    press(&mut bench, Button::Down);
    assert_eq!(root_icon(&bench.display.last_frame().unwrap()), graphics::start_icon());

    press(&mut bench, Button::Down);
    assert_eq!(
        root_icon(&bench.display.last_frame().unwrap()),
        graphics::check(graphics::bluetooth_icon())
    );

    press(&mut bench, Button::Up);
    assert_eq!(root_icon(&bench.display.last_frame().unwrap()), graphics::volume_icon());
}

#[test]
fn test_connect_flow_returns_to_root() {
    let mut bench = disconnected_bench();
    bench.bluetooth.set_connect_delay(Duration::from_millis(200));

    press(&mut bench, Button::Confirm);
    assert_eq!(bench.menu.snapshot().next, MenuStateId::Bluetooth);

    // Enters the Bluetooth list, then selects "speaker".
    press(&mut bench, Button::Down);
    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.current, MenuStateId::Bluetooth);
    assert!(snapshot.discovery_running);
    assert_eq!(snapshot.bluetooth_index, 1);

    let flushes_before = bench.display.flush_count();
    press(&mut bench, Button::Confirm);

    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.connected, Some(Device::new("speaker", "BB")));
    assert_eq!(snapshot.next, MenuStateId::Root);
    assert!(!snapshot.is_loading);

    // The animation drew frames and the screen was left cleared.
    let frames = bench.display.frames();
    let loading = graphics::loading_frames();
    assert!(frames[flushes_before..].iter().any(|f| loading.contains(f)));
    assert!(frames.last().unwrap().is_blank());

    // Nothing draws after the animation has been joined.
    let settled = bench.display.flush_count();
    thread::sleep(Duration::from_millis(120));
    assert_eq!(bench.display.flush_count(), settled);

    press(&mut bench, Button::Up);
    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.current, MenuStateId::Root);
    assert!(!snapshot.discovery_running);
    assert!(!snapshot.root_arrows_hidden);
    assert_eq!(
        bench.bluetooth.connect_attempts().last(),
        Some(&Device::new("speaker", "BB"))
    );
}

#[test]
fn test_slow_refresh_does_not_draw_over_animation() {
    let bluetooth = MockBluetooth::new(devices());
    bluetooth.set_reachable(&["AA"]);
    let config = MenuConfig {
        discovery_interval: Duration::from_millis(20),
        ..MenuConfig::default()
    };
    let mut bench = bench_with(bluetooth, config);

    press(&mut bench, Button::Confirm);
    bench.bluetooth.set_list_delay(Duration::from_millis(100));
    bench.bluetooth.set_connect_delay(Duration::from_millis(400));
    press(&mut bench, Button::Confirm);
    assert!(bench.menu.snapshot().connected.is_some());

    let loading = graphics::loading_frames();
    let frames = bench.display.frames();
    let first = frames.iter().position(|f| loading.contains(f)).unwrap();
    let last = frames.iter().rposition(|f| loading.contains(f)).unwrap();
    assert!(frames[first..=last].iter().all(|f| loading.contains(f)));
}

#[test]
fn test_failed_connect_is_not_an_error() {
    let mut bench = disconnected_bench();

    press(&mut bench, Button::Confirm);
    press(&mut bench, Button::Down);
    press(&mut bench, Button::Down);
    press(&mut bench, Button::Confirm);

    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.connected, None);
    assert_eq!(snapshot.next, MenuStateId::Root);

    press(&mut bench, Button::Down);
    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.current, MenuStateId::Root);
    assert!(snapshot.root_arrows_hidden);
}

#[test]
fn test_volume_menu_seeds_and_sets() {
    let mut bench = connected_bench();

    press(&mut bench, Button::Down);
    press(&mut bench, Button::Down);
    press(&mut bench, Button::Confirm);
    assert_eq!(bench.menu.snapshot().next, MenuStateId::Volume);

    press(&mut bench, Button::Down);
    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.current, MenuStateId::Volume);
    assert_eq!(snapshot.volume_index, 8);

    press(&mut bench, Button::Confirm);
    assert_eq!(bench.volume.percent(), 40);
    assert_eq!(bench.menu.snapshot().next, MenuStateId::Root);
}

#[test]
fn test_refresh_keeps_selected_title() {
    let mut bench = disconnected_bench();
    press(&mut bench, Button::Confirm);
    press(&mut bench, Button::Down);
    press(&mut bench, Button::Down);
    assert_eq!(bench.menu.snapshot().bluetooth_index, 2);

    bench.bluetooth.set_devices(vec![
        Device::new("headset", "CC"),
        Device::new("tv", "DD"),
        Device::new("phone", "AA"),
    ]);
    bench.menu.refresh_bluetooth().unwrap();
    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.bluetooth_titles[snapshot.bluetooth_index], "headset");
    assert_eq!(snapshot.bluetooth_index, 0);

    bench.bluetooth.set_devices(vec![Device::new("tv", "DD")]);
    bench.menu.refresh_bluetooth().unwrap();
    assert_eq!(bench.menu.snapshot().bluetooth_index, 0);
}

#[test]
fn test_empty_list_shows_placeholder() {
    let mut bench = disconnected_bench();
    bench.bluetooth.set_devices(Vec::new());

    press(&mut bench, Button::Confirm);
    press(&mut bench, Button::Confirm);

    let snapshot = bench.menu.snapshot();
    assert_eq!(snapshot.bluetooth_titles, vec!["No Devices"]);
    assert_eq!(snapshot.bluetooth_index, 0);
    assert_eq!(snapshot.next, MenuStateId::Bluetooth);
    assert!(bench.bluetooth.connect_attempts().iter().all(|d| d.address == "none"));
}

#[test]
fn test_discovery_thread_respects_navigation() {
    let bluetooth = MockBluetooth::new(devices());
    let config = MenuConfig {
        discovery_interval: Duration::from_millis(10),
        ..MenuConfig::default()
    };
    let mut bench = bench_with(bluetooth, config);

    press(&mut bench, Button::Confirm);
    press(&mut bench, Button::Down);
    assert!(bench.menu.snapshot().is_navigating);

    thread::sleep(Duration::from_millis(30));
    let paused = bench.bluetooth.list_calls();
    thread::sleep(Duration::from_millis(80));
    assert_eq!(bench.bluetooth.list_calls(), paused);

    bench.clock.advance(Duration::from_secs(4));
    thread::sleep(Duration::from_millis(100));
    assert!(bench.bluetooth.list_calls() >= paused + 2);

    // Selecting an unreachable device returns to root and stops discovery.
    press(&mut bench, Button::Confirm);
    press(&mut bench, Button::Confirm);
    assert!(!bench.menu.snapshot().discovery_running);
    let stopped = bench.bluetooth.list_calls();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(bench.bluetooth.list_calls(), stopped);
}

#[test]
fn test_start_entry_runs_tester() {
    let bluetooth = MockBluetooth::new(devices());
    bluetooth.set_reachable(&["AA"]);
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let buttons = MockButtons::new([Button::Confirm]);
    let hardware = MenuHardware {
        display: SharedDisplay::new(MockDisplay::new()),
        buttons: Box::new(buttons),
        bluetooth: Arc::new(bluetooth),
        volume: Arc::new(MockVolume::new(50)),
        clock: Arc::new(ManualClock::new()),
    };
    let config = MenuConfig {
        default_headphone: "AA".to_string(),
        ..MenuConfig::default()
    };
    let mut menu = MainMenu::new(
        hardware,
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            MenuStateId::Volume
        },
        config,
    )
    .unwrap();

    menu.tick().unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(menu.snapshot().next, MenuStateId::Volume);
}

struct RawButtons(VecDeque<u8>);

impl ButtonInput for RawButtons {
    fn read_button(&mut self) -> Result<Button, Error> {
        let code = self
            .0
            .pop_front()
            .ok_or(Error::Hardware(HardwareError::InputClosed))?;
        Button::from_code(code)
    }
}

#[test]
fn test_unknown_button_fails_tick() {
    let hardware = MenuHardware {
        display: SharedDisplay::new(MockDisplay::new()),
        buttons: Box::new(RawButtons(VecDeque::from([7, Button::CODE_UP]))),
        bluetooth: Arc::new(MockBluetooth::new(devices())),
        volume: Arc::new(MockVolume::new(50)),
        clock: Arc::new(ManualClock::new()),
    };
    let mut menu = MainMenu::new(hardware, || MenuStateId::Root, MenuConfig::default()).unwrap();

    assert!(matches!(menu.tick(), Err(Error::UnknownButton(7))));
    menu.tick().unwrap();
    assert_eq!(menu.snapshot().root_index, 0);
}
