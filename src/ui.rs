use gtk4::gdk::Display;
use gtk4::glib;
use gtk4::prelude::*;
use gtk4::{
    Align, Application, ApplicationWindow, Box as GtkBox, Button, CssProvider, Justification,
    Label, ListBox, ListBoxRow, Orientation, Revealer, RevealerTransitionType, ScrolledWindow,
    Separator,
};
use std::cell::Cell;
use std::rc::Rc;
use tether::backend;
use tether::config::Config;
use tether::models::{Notice, PlatformVersion, ScreenCommand, ScreenEvent, ScreenState};
use tether::screen::{self, EventSender};
use tether::view::{
    DeviceRow, DeviceSection, PERMISSION_HINT, STATE_OFF_CLASS, STATE_ON_CLASS, ScreenView,
};
use tokio::sync::mpsc;
use tracing::{debug, error};

type CommandSender = mpsc::UnboundedSender<ScreenCommand>;

pub fn build_ui(app: &Application, config: &Config) {
    load_css();

    let window = ApplicationWindow::builder()
        .application(app)
        .title("Tether")
        .default_width(420)
        .default_height(760)
        .build();

    window.add_css_class("tether-window");

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    if let Err(err) = spawn_controller(config, command_rx, event_tx) {
        error!(error = %err, "Failed to start screen controller thread");
    }

    let root = GtkBox::new(Orientation::Vertical, 16);
    root.set_margin_top(16);
    root.set_margin_bottom(16);
    root.set_margin_start(16);
    root.set_margin_end(16);

    let header = build_state_header();
    let hint = Label::new(Some(PERMISSION_HINT));
    hint.add_css_class("tether-hint");
    hint.set_wrap(true);
    hint.set_justify(Justification::Center);

    let grant = build_action_button(
        "Grant permissions",
        &command_tx,
        ScreenCommand::RequestPermissions,
    );
    grant.set_halign(Align::Center);

    let toggles = GtkBox::new(Orientation::Horizontal, 16);
    toggles.set_homogeneous(true);
    toggles.append(&build_action_button(
        "Turn on hotspot",
        &command_tx,
        ScreenCommand::SetHotspot(true),
    ));
    toggles.append(&build_action_button(
        "Turn off hotspot",
        &command_tx,
        ScreenCommand::SetHotspot(false),
    ));

    let ip_label = Label::new(None);
    ip_label.add_css_class("tether-section-title");
    ip_label.set_halign(Align::Start);

    let devices_header = GtkBox::new(Orientation::Horizontal, 8);
    let devices_title = Label::new(Some("Connected devices"));
    devices_title.add_css_class("tether-section-title");
    devices_title.set_halign(Align::Start);
    devices_title.set_hexpand(true);
    let refresh = Button::with_label("Refresh");
    let refresh_tx = command_tx.clone();
    refresh.connect_clicked(move |_| send_command(&refresh_tx, ScreenCommand::Refresh));
    devices_header.append(&devices_title);
    devices_header.append(&refresh);

    let devices = ListBox::new();
    devices.add_css_class("tether-list");
    devices.set_selection_mode(gtk4::SelectionMode::None);
    devices.set_show_separators(true);
    let scroller = ScrolledWindow::builder()
        .child(&devices)
        .vexpand(true)
        .build();

    let restricted = Label::new(None);
    restricted.add_css_class("tether-restricted");
    restricted.set_wrap(true);
    restricted.set_justify(Justification::Center);
    restricted.set_vexpand(true);

    let (toast, toast_label) = build_toast();

    root.append(&header.container);
    root.append(&hint);
    root.append(&grant);
    root.append(&toggles);
    root.append(&divider());
    root.append(&ip_label);
    root.append(&devices_header);
    root.append(&scroller);
    root.append(&restricted);
    root.append(&toast);

    let widgets = Rc::new(ScreenWidgets {
        state_value: header.value,
        ip_label,
        devices,
        scroller,
        restricted,
        toast,
        toast_label,
        toast_generation: Rc::new(Cell::new(0)),
        platform: config.platform_version(),
    });
    widgets.render(&ScreenState::default());

    glib::spawn_future_local(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                ScreenEvent::StateChanged(state) => widgets.render(&state),
                ScreenEvent::Notice(notice) => widgets.show_notice(&notice),
            }
        }
        debug!("Screen event stream closed");
    });

    window.set_child(Some(&root));
    window.present();
}

/// Runs the screen controller on its own single-threaded runtime. The
/// controller unmounts once every command sender held by the window is gone.
fn spawn_controller(
    config: &Config,
    commands: mpsc::UnboundedReceiver<ScreenCommand>,
    events: EventSender,
) -> std::io::Result<()> {
    let config = config.clone();
    std::thread::Builder::new()
        .name("tether-screen".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!(error = %err, "Failed to build screen runtime");
                    return;
                }
            };
            let local = tokio::task::LocalSet::new();
            local.block_on(&runtime, async move {
                let service = backend::connect(&config);
                screen::run(service, events, config.refresh.interval(), commands).await;
            });
        })?;
    Ok(())
}

struct StateHeader {
    container: GtkBox,
    value: Label,
}

fn build_state_header() -> StateHeader {
    let container = GtkBox::new(Orientation::Horizontal, 0);
    container.set_halign(Align::Center);

    let title = Label::new(Some("Hotspot state: "));
    title.add_css_class("tether-state");
    let value = Label::new(None);
    value.add_css_class("tether-state");

    container.append(&title);
    container.append(&value);

    StateHeader { container, value }
}

fn build_action_button(label: &str, commands: &CommandSender, command: ScreenCommand) -> Button {
    let button = Button::with_label(label);
    button.add_css_class("tether-button");
    let commands = commands.clone();
    button.connect_clicked(move |_| send_command(&commands, command.clone()));
    button
}

fn build_device_row(device: &DeviceRow) -> ListBoxRow {
    let row = ListBoxRow::new();
    row.set_activatable(false);

    let container = GtkBox::new(Orientation::Vertical, 2);
    container.set_margin_top(8);
    container.set_margin_bottom(8);

    for line in [&device.ip_line, &device.mac_line] {
        let label = Label::new(Some(line.as_str()));
        label.add_css_class("tether-item");
        label.set_halign(Align::Start);
        container.append(&label);
    }

    row.set_child(Some(&container));
    row
}

fn build_toast() -> (Revealer, Label) {
    let label = Label::new(None);
    label.add_css_class("tether-toast");
    label.set_wrap(true);

    let revealer = Revealer::builder()
        .transition_type(RevealerTransitionType::Crossfade)
        .reveal_child(false)
        .halign(Align::Center)
        .child(&label)
        .build();

    (revealer, label)
}

fn divider() -> Separator {
    let separator = Separator::new(Orientation::Horizontal);
    separator.add_css_class("tether-divider");
    separator
}

fn send_command(commands: &CommandSender, command: ScreenCommand) {
    if commands.send(command).is_err() {
        error!("Screen controller is not running");
    }
}

struct ScreenWidgets {
    state_value: Label,
    ip_label: Label,
    devices: ListBox,
    scroller: ScrolledWindow,
    restricted: Label,
    toast: Revealer,
    toast_label: Label,
    toast_generation: Rc<Cell<u64>>,
    platform: PlatformVersion,
}

impl ScreenWidgets {
    fn render(&self, state: &ScreenState) {
        let view = ScreenView::build(state, self.platform);

        self.state_value.set_label(view.state_label);
        self.state_value.remove_css_class(STATE_ON_CLASS);
        self.state_value.remove_css_class(STATE_OFF_CLASS);
        self.state_value.add_css_class(view.state_class);

        self.ip_label.set_label(&view.ip_line);

        match view.devices {
            DeviceSection::List(rows) => {
                while let Some(child) = self.devices.first_child() {
                    self.devices.remove(&child);
                }
                for row in &rows {
                    self.devices.append(&build_device_row(row));
                }
                self.restricted.set_visible(false);
                self.scroller.set_visible(true);
            }
            DeviceSection::Restricted(message) => {
                self.restricted.set_label(message);
                self.scroller.set_visible(false);
                self.restricted.set_visible(true);
            }
        }
    }

    /// A newer notice replaces the current one and restarts its timeout.
    fn show_notice(&self, notice: &Notice) {
        let generation = self.toast_generation.get() + 1;
        self.toast_generation.set(generation);
        self.toast_label.set_label(&notice.message);
        self.toast.set_reveal_child(true);

        let toast = self.toast.clone();
        let current = self.toast_generation.clone();
        glib::timeout_add_local_once(notice.duration.as_duration(), move || {
            if current.get() == generation {
                toast.set_reveal_child(false);
            }
        });
    }
}

fn load_css() {
    let css = r#"
    .tether-window {
        background: #fafafa;
        color: #202020;
        font-family: "Cantarell", "Noto Sans", sans-serif;
    }

    .tether-state {
        font-size: 36px;
    }

    .tether-on {
        color: green;
    }

    .tether-off {
        color: red;
    }

    .tether-hint {
        color: red;
        font-size: 18px;
    }

    .tether-button {
        background: #359962;
        color: #ffffff;
        font-size: 16px;
        border-radius: 10px;
        padding: 14px;
        margin-bottom: 10px;
    }

    .tether-divider {
        background: #359962;
        min-height: 2px;
    }

    .tether-section-title {
        font-size: 24px;
    }

    .tether-list {
        background: transparent;
    }

    .tether-item {
        color: green;
        font-size: 18px;
    }

    .tether-restricted {
        color: red;
        font-size: 36px;
    }

    .tether-toast {
        background: #323232;
        color: #ffffff;
        border-radius: 18px;
        padding: 8px 16px;
    }
    "#;

    let provider = CssProvider::new();
    provider.load_from_data(css);

    if let Some(display) = Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}
