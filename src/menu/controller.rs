//! Main menu controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, trace, warn};

use crate::bitmap::Bitmap;
use crate::config::{MENU_TEXT_HEIGHT, MenuConfig, SCREEN_HEIGHT, VOLUME_STEP};
use crate::error::Error;
use crate::graphics;
use crate::hardware::{BluetoothManager, Button, ButtonInput, Device, VolumeControl};
use crate::menu::{Menu, MenuElement, MenuStateId};
use crate::state::MenuSnapshot;
use crate::sync::{BackgroundTask, Clock, NavigationWindow, SharedDisplay, StopFlag};

/// Root menu entry opening the Bluetooth list.
const ROOT_BLUETOOTH: usize = 1;

const NO_DEVICES: &str = "No Devices";

/// What selecting an element does.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    /// Switch to another screen.
    Goto(MenuStateId),
    /// Run the host's test entry point.
    StartTest,
    /// Connect audio output to a device.
    Connect(Device),
    /// Set the output volume in percent.
    SetVolume(u8),
    /// Placeholder entry; selecting it does nothing.
    Nothing,
}

/// Collaborators used by the menu.
pub struct MenuHardware {
    /// Display shared with the background threads.
    pub display: SharedDisplay,
    /// Blocking source of button presses.
    pub buttons: Box<dyn ButtonInput>,
    /// Device discovery and connection.
    pub bluetooth: Arc<dyn BluetoothManager>,
    /// Output volume.
    pub volume: Arc<dyn VolumeControl>,
    /// Time source for the navigation window.
    pub clock: Arc<dyn Clock>,
}

struct MenuModel {
    current: MenuStateId,
    next: MenuStateId,
    connected: Option<Device>,
    root: Menu<MenuAction>,
    bluetooth: Menu<MenuAction>,
    volume: Menu<MenuAction>,
}

impl MenuModel {
    fn menu(&self, id: MenuStateId) -> &Menu<MenuAction> {
        match id {
            MenuStateId::Root => &self.root,
            MenuStateId::Bluetooth => &self.bluetooth,
            MenuStateId::Volume => &self.volume,
        }
    }

    fn menu_mut(&mut self, id: MenuStateId) -> &mut Menu<MenuAction> {
        match id {
            MenuStateId::Root => &mut self.root,
            MenuStateId::Bluetooth => &mut self.bluetooth,
            MenuStateId::Volume => &mut self.volume,
        }
    }
}

/// State reachable from the background threads.
///
/// Lock order is model, then display.
struct Shared {
    model: Mutex<MenuModel>,
    display: SharedDisplay,
    bluetooth: Arc<dyn BluetoothManager>,
    clock: Arc<dyn Clock>,
    navigation: NavigationWindow,
    is_loading: AtomicBool,
    loading_frames: Vec<Bitmap>,
    config: MenuConfig,
}

impl Shared {
    fn lock_model(&self) -> MutexGuard<'_, MenuModel> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_navigating(&self) -> bool {
        self.navigation.is_active(self.clock.now())
    }

    fn refresh_bluetooth(&self) -> Result<(), Error> {
        debug!("refresh bluetooth");
        let devices = self.bluetooth.list_devices()?;

        let items = if devices.is_empty() {
            debug!("no bluetooth devices found, setting placeholder");
            vec![MenuElement::text(NO_DEVICES, MenuAction::Nothing)]
        } else {
            devices
                .into_iter()
                .map(|device| MenuElement::text(device.name.clone(), MenuAction::Connect(device)))
                .collect()
        };

        let mut model = self.lock_model();
        model.bluetooth.replace_items(items);
        debug!("set bluetooth list to {:?}", model.bluetooth.titles());

        if model.current == MenuStateId::Bluetooth {
            // Checked under the model lock, which also guards raising the flag.
            if self.is_loading.load(Ordering::SeqCst) {
                debug!("loading animation running, skipping bluetooth redraw");
            } else {
                self.display.show(&model.bluetooth.list_img())?;
            }
        }
        Ok(())
    }

    /// One discovery pass. Returns whether a refresh ran.
    fn discovery_cycle(&self) -> bool {
        let in_bluetooth = self.lock_model().current == MenuStateId::Bluetooth;
        if !in_bluetooth || self.is_loading.load(Ordering::SeqCst) || self.is_navigating() {
            trace!("skipping bluetooth refresh");
            return false;
        }

        debug!("conditions met, refreshing bluetooth");
        if let Err(e) = self.refresh_bluetooth() {
            warn!("bluetooth refresh failed: {e}");
        }
        true
    }

    fn discovery_loop(&self, stop: &StopFlag) {
        while !stop.is_stopped() {
            self.discovery_cycle();
            if stop.sleep(self.config.discovery_interval) {
                break;
            }
        }
        debug!("bluetooth update loop exited");
    }

    fn loading_animation_loop(&self, stop: &StopFlag) {
        let frame_count = self.loading_frames.len();
        let mut frame_index = 0;
        while frame_count > 0 && !stop.is_stopped() {
            if let Err(e) = self.display.show(&self.loading_frames[frame_index]) {
                warn!("loading animation stopped: {e}");
                break;
            }
            frame_index = (frame_index + 1) % frame_count;
            if stop.sleep(self.config.animation_frame_interval) {
                break;
            }
        }
    }
}

fn try_connect(bluetooth: &dyn BluetoothManager, device: &Device) -> bool {
    match bluetooth.connect(device) {
        Ok(true) => {
            info!("connected to \"{}\" ({})", device.name, device.address);
            true
        }
        Ok(false) => {
            info!("failed to connect \"{}\"", device.name);
            false
        }
        Err(e) => {
            warn!("failed to connect \"{}\": {e}", device.name);
            false
        }
    }
}

/// The instrument's main menu: root, Bluetooth and volume screens.
///
/// The host calls [`MainMenu::tick`] once per UI frame. While the Bluetooth
/// screen is open a background thread refreshes the device list; selecting a
/// device shows a loading animation on a second thread until the connection
/// attempt finishes.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use acuity_core::{
///     Button, MainMenu, MenuConfig, MenuHardware, MenuStateId, MockBluetooth, MockButtons,
///     MockDisplay, MockVolume, SharedDisplay, SystemClock,
/// };
///
/// let hardware = MenuHardware {
///     display: SharedDisplay::new(MockDisplay::new()),
///     buttons: Box::new(MockButtons::new([Button::Down])),
///     bluetooth: Arc::new(MockBluetooth::default()),
///     volume: Arc::new(MockVolume::new(50)),
///     clock: Arc::new(SystemClock),
/// };
/// let mut menu = MainMenu::new(hardware, || MenuStateId::Root, MenuConfig::default())?;
/// menu.tick()?;
/// # Ok::<(), acuity_core::Error>(())
/// ```
pub struct MainMenu {
    shared: Arc<Shared>,
    buttons: Box<dyn ButtonInput>,
    volume: Arc<dyn VolumeControl>,
    tester: Box<dyn FnMut() -> MenuStateId + Send>,
    discovery: Option<BackgroundTask>,
}

impl MainMenu {
    /// Build the menus, try the default headphone and load the device list.
    ///
    /// `tester` runs when the root "start" entry is selected and returns the
    /// screen to show afterwards.
    ///
    /// # Errors
    ///
    /// Fails if the initial device list cannot be read.
    pub fn new<F>(hardware: MenuHardware, tester: F, config: MenuConfig) -> Result<Self, Error>
    where
        F: FnMut() -> MenuStateId + Send + 'static,
    {
        let root = Menu::new(
            vec![
                MenuElement::icon(graphics::start_icon(), "start", MenuAction::StartTest),
                MenuElement::icon(
                    graphics::bluetooth_icon(),
                    "bluetooth",
                    MenuAction::Goto(MenuStateId::Bluetooth),
                ),
                MenuElement::icon(
                    graphics::volume_icon(),
                    "volume",
                    MenuAction::Goto(MenuStateId::Volume),
                ),
            ],
            SCREEN_HEIGHT,
        );

        let volume = Menu::new(
            (0..=100u8)
                .step_by(usize::from(VOLUME_STEP))
                .map(|p| MenuElement::text(format!("{p}%"), MenuAction::SetVolume(p)))
                .collect(),
            MENU_TEXT_HEIGHT,
        );

        let default_device = Device::new("default", config.default_headphone.clone());
        let connected = try_connect(hardware.bluetooth.as_ref(), &default_device)
            .then_some(default_device);
        info!("connect to default device: {}", connected.is_some());

        let shared = Arc::new(Shared {
            model: Mutex::new(MenuModel {
                current: MenuStateId::Root,
                next: MenuStateId::Root,
                connected,
                root,
                bluetooth: Menu::new(Vec::new(), MENU_TEXT_HEIGHT),
                volume,
            }),
            display: hardware.display,
            bluetooth: hardware.bluetooth,
            clock: hardware.clock,
            navigation: NavigationWindow::new(config.navigation_quiet),
            is_loading: AtomicBool::new(false),
            loading_frames: graphics::loading_frames(),
            config,
        });
        shared.refresh_bluetooth()?;

        Ok(Self {
            shared,
            buttons: hardware.buttons,
            volume: hardware.volume,
            tester: Box::new(tester),
            discovery: None,
        })
    }

    /// Run one UI frame: settle the screen, render it, then handle one button.
    ///
    /// Blocks in [`ButtonInput::read_button`], and for the whole connection
    /// attempt when a device is selected.
    ///
    /// # Errors
    ///
    /// Hardware failures and unknown button codes. The menu stays usable; the
    /// host decides whether to keep ticking.
    pub fn tick(&mut self) -> Result<(), Error> {
        let transition = {
            let mut model = self.shared.lock_model();
            info!(
                "enter tick with current: {:?}, next: {:?}",
                model.current, model.next
            );

            if model.connected.is_none() {
                debug!("not connected to a device");
                if model.current != MenuStateId::Bluetooth && model.next != MenuStateId::Bluetooth
                {
                    model.next = MenuStateId::Root;
                    model.root.set_select_index(ROOT_BLUETOOTH);
                }
                model.root.set_hide_arrows(true);
            } else {
                model.root.set_hide_arrows(false);
            }

            (model.current != model.next).then_some(model.next)
        };

        if let Some(target) = transition {
            self.enter(target)?;
        }

        let active = {
            let mut model = self.shared.lock_model();
            if let Some(target) = transition {
                model.current = target;
            }
            let active = model.current;
            debug!("selected index: {}", model.menu(active).select_index());

            if active == MenuStateId::Root && model.root.select_index() == ROOT_BLUETOOTH {
                let icon = if model.connected.is_some() {
                    graphics::check(graphics::bluetooth_icon())
                } else {
                    graphics::cross(graphics::bluetooth_icon())
                };
                if let Some(element) = model.root.selected_mut() {
                    element.set_icon(icon);
                }
            }

            self.shared.display.show(&model.menu(active).list_img())?;
            active
        };

        let button = self.buttons.read_button()?;
        info!("got button {:?}", button);

        match button {
            Button::Up | Button::Down => {
                self.shared.navigation.arm(self.shared.clock.now());
                let mut model = self.shared.lock_model();
                let menu = model.menu_mut(active);
                if button == Button::Up {
                    menu.move_up();
                } else {
                    menu.move_down();
                }
            }
            Button::Confirm => {
                let action = self.shared.lock_model().menu(active).select();
                let next = match action {
                    Some(action) => self.perform(action)?,
                    None => None,
                };
                if let Some(next) = next {
                    self.shared.lock_model().next = next;
                }
            }
        }
        Ok(())
    }

    /// Refresh the Bluetooth device list now.
    pub fn refresh_bluetooth(&self) -> Result<(), Error> {
        self.shared.refresh_bluetooth()
    }

    /// Run one background discovery pass on the caller's thread.
    ///
    /// Returns whether the list was refreshed; passes are skipped outside the
    /// Bluetooth screen, while loading, and while the user is navigating.
    pub fn discovery_cycle(&self) -> bool {
        self.shared.discovery_cycle()
    }

    /// A snapshot of the menu state.
    pub fn snapshot(&self) -> MenuSnapshot {
        let model = self.shared.lock_model();
        MenuSnapshot {
            current: model.current,
            next: model.next,
            connected: model.connected.clone(),
            is_loading: self.shared.is_loading.load(Ordering::SeqCst),
            is_navigating: self.shared.is_navigating(),
            discovery_running: self.discovery.as_ref().is_some_and(BackgroundTask::is_running),
            root_index: model.root.select_index(),
            bluetooth_index: model.bluetooth.select_index(),
            volume_index: model.volume.select_index(),
            bluetooth_titles: model.bluetooth.titles(),
            root_arrows_hidden: model.root.hide_arrows(),
        }
    }

    /// Stop and join the background discovery thread.
    pub fn shutdown(&mut self) {
        self.stop_discovery();
        self.shared.navigation.cancel();
    }

    fn enter(&mut self, target: MenuStateId) -> Result<(), Error> {
        match target {
            MenuStateId::Root => {
                info!("change to root");
                self.stop_discovery();
            }
            MenuStateId::Bluetooth => {
                info!("change to bluetooth");
                self.shared.refresh_bluetooth()?;
                self.start_discovery()?;
            }
            MenuStateId::Volume => {
                info!("change to volume");
                let percent = self.volume.get_volume()?;
                self.shared
                    .lock_model()
                    .volume
                    .set_select_index(usize::from(percent / VOLUME_STEP));
            }
        }
        Ok(())
    }

    fn perform(&mut self, action: MenuAction) -> Result<Option<MenuStateId>, Error> {
        match action {
            MenuAction::Goto(target) => {
                info!("enter {:?}", target);
                Ok(Some(target))
            }
            MenuAction::StartTest => {
                info!("start test");
                Ok(Some((self.tester)()))
            }
            MenuAction::Connect(device) => self.connect(device).map(Some),
            MenuAction::SetVolume(percent) => {
                if percent > 100 {
                    return Err(Error::InvalidVolume(percent));
                }
                self.volume.set_volume(percent)?;
                info!("set volume to {percent}%");
                Ok(Some(MenuStateId::Root))
            }
            MenuAction::Nothing => Ok(None),
        }
    }

    fn connect(&mut self, device: Device) -> Result<MenuStateId, Error> {
        let animation = self.start_loading_animation()?;
        let connected = try_connect(self.shared.bluetooth.as_ref(), &device);
        self.shared.lock_model().connected = connected.then_some(device);
        self.stop_loading_animation(animation)?;
        Ok(MenuStateId::Root)
    }

    fn start_loading_animation(&self) -> Result<BackgroundTask, Error> {
        info!("starting loading animation");
        {
            let _model = self.shared.lock_model();
            self.shared.is_loading.store(true, Ordering::SeqCst);
        }
        let shared = Arc::clone(&self.shared);
        BackgroundTask::spawn("loading-animation", move |stop| {
            shared.loading_animation_loop(&stop)
        })
        .inspect_err(|_| self.shared.is_loading.store(false, Ordering::SeqCst))
    }

    /// Stop the animation, wait for its thread, then leave the screen cleared.
    fn stop_loading_animation(&self, mut animation: BackgroundTask) -> Result<(), Error> {
        info!("stopping loading animation");
        animation.stop_and_join();
        self.shared.is_loading.store(false, Ordering::SeqCst);
        self.shared.display.blank()?;
        Ok(())
    }

    fn start_discovery(&mut self) -> Result<(), Error> {
        self.stop_discovery();
        let shared = Arc::clone(&self.shared);
        self.discovery = Some(BackgroundTask::spawn("bt-discovery", move |stop| {
            shared.discovery_loop(&stop)
        })?);
        info!("started bluetooth update thread");
        Ok(())
    }

    fn stop_discovery(&mut self) {
        if let Some(mut task) = self.discovery.take() {
            task.stop_and_join();
            info!("stopped bluetooth update thread");
        }
    }
}

impl Drop for MainMenu {
    fn drop(&mut self) {
        self.shutdown();
        info!("main menu destroyed");
    }
}
