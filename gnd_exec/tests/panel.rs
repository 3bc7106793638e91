//! Drives a whole panel against a mock rover server with a simulated clock.

use std::sync::Mutex;

use comms_if::{
    net::{reqwest::StatusCode, Transport, TransportError},
    tc::{Ack, CommandBody},
    tm::{DataRecord, HistoryRecord, RawValue},
};
use gnd_lib::{
    dispatcher::ControlId,
    input::{Control, GamepadSample, InputEvent, LatchedGamepad},
    net_worker::{perform, NetRequest},
    panel::Panel,
    params::GndExecParams,
    render::{HistorySummary, PanelView, RenderTarget},
};
use util::time::{Clock, SimClock};

// ------------------------------------------------------------------------------------------------
// MOCKS
// ------------------------------------------------------------------------------------------------

struct MockServer {
    state: Mutex<ServerState>,
}

#[derive(Default)]
struct ServerState {
    data: DataRecord,
    offline: bool,
    posted: Vec<CommandBody>,
}

#[derive(Default)]
struct Recorder {
    views: Vec<PanelView>,
    pressed: Vec<(ControlId, bool)>,
    histories: Vec<HistorySummary>,
}

impl MockServer {
    fn new(power: bool, mode: &str) -> Self {
        Self {
            state: Mutex::new(ServerState {
                data: DataRecord {
                    power: Some(power),
                    mode: Some(mode.to_string()),
                    last_seen: Some(String::from("2024-05-01 12:00:00")),
                    temperature: Some(RawValue::Number(21.5)),
                    air_quality_raw: Some(RawValue::Number(16384.0)),
                    ..Default::default()
                },
                ..Default::default()
            }),
        }
    }

    fn set_mode(&self, mode: &str) {
        self.state.lock().unwrap().data.mode = Some(mode.to_string());
    }

    fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    fn posted(&self) -> Vec<CommandBody> {
        self.state.lock().unwrap().posted.clone()
    }

    fn num_posted(&self, command: &str) -> usize {
        self.posted().iter().filter(|b| b.command == command).count()
    }
}

impl Transport for MockServer {
    fn post_command(&self, body: &CommandBody) -> Result<Ack, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(TransportError::StatusError(
                String::from("/command"),
                StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        state.posted.push(body.clone());
        Ok(Ack::default())
    }

    fn get_data(&self) -> Result<DataRecord, TransportError> {
        let state = self.state.lock().unwrap();
        if state.offline {
            return Err(TransportError::StatusError(
                String::from("/api/data"),
                StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        Ok(state.data.clone())
    }

    fn get_history(&self) -> Result<HistoryRecord, TransportError> {
        Ok(HistoryRecord {
            labels: vec!["10:00".into(), "10:01".into()],
            temperature_c: Some(vec![21.0, 22.0]),
            humidity: Some(vec![40.0, 41.0]),
            air_quality_raw: Some(vec![0.0, 32767.0]),
            ..Default::default()
        })
    }
}

impl RenderTarget for Recorder {
    fn render(&mut self, view: &PanelView) {
        self.views.push(view.clone());
    }

    fn set_pressed(&mut self, control: ControlId, pressed: bool) {
        self.pressed.push((control, pressed));
    }

    fn render_history(&mut self, summary: &HistorySummary) {
        self.histories.push(summary.clone());
    }
}

// ------------------------------------------------------------------------------------------------
// HELPERS
// ------------------------------------------------------------------------------------------------

struct Rig {
    clock: SimClock,
    server: MockServer,
    pad: LatchedGamepad,
    panel: Panel<Recorder>,
}

impl Rig {
    fn new(power: bool, mode: &str) -> Self {
        let clock = SimClock::default();
        let panel = Panel::new(&GndExecParams::default(), Recorder::default(), clock.now());

        let mut rig = Self {
            clock,
            server: MockServer::new(power, mode),
            pad: LatchedGamepad::new(),
            panel,
        };

        // Start-up poll and history
        rig.step(0);
        rig
    }

    /// Perform requests immediately, completions arriving at the current time.
    fn serve(&mut self, reqs: Vec<NetRequest>) {
        let now = self.clock.now();
        for req in reqs {
            let completion = perform(&self.server, req);
            self.panel.handle_completion(completion, now);
        }
    }

    /// Advance the clock and run one cycle.
    fn step(&mut self, ms: i64) {
        self.clock.advance_ms(ms);
        let reqs = self.panel.tick(&mut self.pad, self.clock.now());
        self.serve(reqs);
    }

    fn input(&mut self, event: InputEvent) {
        let reqs = self.panel.handle_input(&event, self.clock.now());
        self.serve(reqs);
    }

    fn mode(&self) -> Option<String> {
        self.panel.display().mode.clone()
    }

    fn mode_label(&self) -> Option<String> {
        self.panel.renderer().view().and_then(|v| v.mode.clone())
    }
}

fn press(control: Control) -> InputEvent {
    InputEvent::PointerDown { control }
}

fn pad_buttons(pressed: &[usize]) -> GamepadSample {
    let mut buttons = vec![false; 16];
    for b in pressed {
        buttons[*b] = true;
    }
    GamepadSample {
        buttons,
        axes: vec![0.0, 0.0],
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[test]
fn test_startup_shows_server_state() {
    let rig = Rig::new(true, "manual");
    let view = rig.panel.renderer().view().unwrap();

    assert_eq!(view.power, "Rover Power: ON");
    assert_eq!(view.mode.as_deref(), Some("Current Mode: Manual"));
    assert_eq!(view.temperature.as_deref(), Some("21.50 °C"));
    assert_eq!(view.air_quality.as_deref(), Some("500 ppm (raw 16384)"));
    assert_eq!(view.humidity, None);

    let target = rig.panel.renderer().target();
    assert_eq!(target.histories.len(), 1);
    assert_eq!(target.histories[0].points, 2);
}

#[test]
fn test_mode_change_survives_stale_polls_until_confirmed() {
    let mut rig = Rig::new(true, "manual");

    rig.input(press(Control::Autonomous));
    assert_eq!(rig.mode().as_deref(), Some("autonomous"));
    assert_eq!(rig.mode_label().as_deref(), Some("Current Mode: Autonomous"));
    assert_eq!(
        rig.server.posted(),
        vec![CommandBody {
            command: String::from("mode_change"),
            mode: Some(String::from("autonomous"))
        }]
    );

    // The server hasn't caught up yet
    for _ in 0..3 {
        rig.step(1000);
        assert_eq!(rig.mode().as_deref(), Some("autonomous"));
    }

    rig.server.set_mode("autonomous");
    rig.step(1000);
    assert!(rig.panel.reconciler().current_override().is_none());

    // Once confirmed the server drives the display again
    rig.server.set_mode("assisted");
    rig.step(1000);
    assert_eq!(rig.mode().as_deref(), Some("assisted"));
}

#[test]
fn test_unconfirmed_mode_change_expires() {
    let mut rig = Rig::new(true, "manual");

    rig.input(press(Control::Assisted));

    for _ in 0..5 {
        rig.step(1000);
    }
    assert_eq!(rig.mode().as_deref(), Some("assisted"));

    rig.step(1000);
    assert_eq!(rig.mode().as_deref(), Some("manual"));
    assert_eq!(rig.panel.reconciler().num_expired, 1);
}

#[test]
fn test_repeated_presses_are_debounced() {
    let mut rig = Rig::new(true, "manual");

    for _ in 0..5 {
        rig.input(press(Control::Forward));
        rig.step(16);
    }
    assert_eq!(rig.server.num_posted("forward"), 1);

    // The window is over after 150 ms
    rig.step(100);
    rig.input(InputEvent::KeyDown {
        control: Control::Forward,
        key: "Enter".parse().unwrap(),
    });
    assert_eq!(rig.server.num_posted("forward"), 2);
}

#[test]
fn test_gamepad_power_button_once_per_press() {
    let mut rig = Rig::new(false, "manual");
    rig.input(InputEvent::GamepadConnected { index: 0 });

    for _ in 0..2 {
        rig.pad.set(0, pad_buttons(&[2]));
        for _ in 0..10 {
            rig.step(16);
        }
        rig.pad.set(0, pad_buttons(&[]));
        for _ in 0..5 {
            rig.step(16);
        }
    }

    // The server never turned on, so both presses ask for power on
    assert_eq!(rig.server.num_posted("power_on"), 2);
    assert_eq!(rig.server.num_posted("power_off"), 0);
}

#[test]
fn test_gamepad_and_buttons_share_feedback_window() {
    let mut rig = Rig::new(true, "manual");
    rig.input(InputEvent::GamepadConnected { index: 0 });

    rig.input(press(Control::Stop));
    rig.pad.set(0, pad_buttons(&[9]));
    rig.step(16);

    assert_eq!(rig.server.num_posted("stop"), 1);
    assert!(rig
        .panel
        .renderer()
        .target()
        .pressed
        .contains(&(ControlId::Move(comms_if::tc::Direction::Stop), true)));
}

#[test]
fn test_outage_keeps_last_known_display() {
    let mut rig = Rig::new(true, "manual");
    let before = rig.panel.display().clone();
    let num_views = rig.panel.renderer().target().views.len();

    rig.server.set_offline(true);
    rig.input(press(Control::Left));
    for _ in 0..3 {
        rig.step(1000);
    }

    assert_eq!(rig.panel.display(), &before);
    assert_eq!(rig.panel.renderer().target().views.len(), num_views);

    rig.server.set_offline(false);
    rig.server.set_mode("assisted");
    rig.step(1000);
    assert_eq!(rig.mode().as_deref(), Some("assisted"));
}
