//! Ground control panel executable entry point.
//!
//! # Architecture
//!
//! The panel runs a fixed period executive loop, one cycle per display frame:
//!
//!     - Operator input acquisition, from the console or an input script
//!     - Gamepad connection changes
//!     - Network completion handling:
//!         - Telemetry reconciliation
//!         - History display
//!     - Scheduled task processing:
//!         - Telemetry polling
//!         - Gamepad sampling
//!         - Feedback window expiry
//!     - Network request submission
//!
//! Network requests are performed on worker threads so the loop never blocks on the server.
//!
//! The panel's clock is monotonic. It starts at the wall time and is then advanced by the system's
//! monotonic timer, so stepping the wall clock doesn't disturb polling or feedback windows.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::{
    env,
    sync::{
        mpsc::{Receiver, TryRecvError},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

// Internal
use comms_if::net::{HttpTransport, NetParams};
use gnd_lib::{
    console::{self, ConsoleAction},
    input::{GamepadSource, GilrsGamepad, LatchedGamepad, ScriptEvent},
    net_worker::NetWorker,
    panel::Panel,
    params::GndExecParams,
    render::TerminalRenderer,
};
use util::{
    logger::{logger_init, parse_level},
    script_interpreter::{Pending, ScriptInterpreter},
    session::Session,
    time::{seconds_between, Clock, SystemClock},
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where operator input comes from.
enum InputSource {
    Console(Receiver<ConsoleAction>),
    Script(ScriptInterpreter<ScriptEvent>),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("gnd_exec", "sessions").wrap_err("Failed to create the session")?;

    // Parameters are needed before logging to know the level
    let params: GndExecParams =
        util::params::load("gnd_exec.toml").wrap_err("Could not load gnd_exec params")?;

    // Initialise logger
    logger_init(
        parse_level(&params.log_level).wrap_err("Invalid log level")?,
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    info!("Rover Ground Control Panel\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");
    debug!("{:#?}", params);

    // ---- INITIALISE INPUT SOURCE ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // Length of the script, the last event's time is lost once it has fired
    let mut script_duration_s = 0.0;

    let mut input_source = if args.len() == 2 {
        info!("Loading script from \"{}\"", &args[1]);

        let si = ScriptInterpreter::<ScriptEvent>::new(&args[1])
            .wrap_err("Failed to load script")?;
        script_duration_s = si.get_duration();

        info!(
            "Loaded script lasts {:.02} s and contains {} events\n",
            si.get_duration(),
            si.get_num_events()
        );

        InputSource::Script(si)
    } else if args.len() == 1 {
        info!("No script provided, reading input from the console\n");

        InputSource::Console(console::spawn().wrap_err("Failed to start the console")?)
    } else {
        return Err(eyre!(
            "Expected either zero or one argument, found {}",
            args.len() - 1
        ));
    };

    // ---- INITIALISE NETWORK ----

    let transport = HttpTransport::new(&net_params)
        .wrap_err("Failed to initialise the HTTP transport")?;
    let mut net = NetWorker::new(Arc::new(transport));

    info!("Talking to the rover server at {}", net_params.base_url);

    // ---- INITIALISE PANEL ----

    let clock = SystemClock::new();
    let start = clock.now();
    let mut panel = Panel::new(&params, TerminalRenderer::new(), start);

    // ---- INITIALISE GAMEPADS ----

    // Scripts drive the latched pad, otherwise real pads are used if there are any
    let mut latched = LatchedGamepad::new();
    let mut device = match input_source {
        InputSource::Console(_) => match GilrsGamepad::new() {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("Gamepads are unavailable: {}", e);
                None
            }
        },
        InputSource::Script(_) => None,
    };

    let cycle_period = Duration::from_millis(params.frame_period_ms);

    // Scripts keep running for one poll after their last event so its effect is seen
    let script_grace_s = params.poll_period_ms as f64 * 1e-3;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    'main: loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();
        let now = clock.now();

        let mut requests = Vec::new();

        // ---- OPERATOR INPUT ----

        match input_source {
            InputSource::Console(ref rx) => loop {
                match rx.try_recv() {
                    Ok(ConsoleAction::Input(event)) => {
                        requests.extend(panel.handle_input(&event, now))
                    }
                    Ok(ConsoleAction::History) => requests.push(panel.request_history()),
                    Ok(ConsoleAction::Quit) | Err(TryRecvError::Disconnected) => {
                        info!("Quit requested");
                        break 'main;
                    }
                    Err(TryRecvError::Empty) => break,
                }
            },
            InputSource::Script(ref mut si) => {
                let elapsed_s = seconds_between(&start, &now);

                match si.get_pending(elapsed_s) {
                    Pending::None => (),
                    Pending::Some(events) => {
                        for e in events {
                            if let Some(event) = e.apply(&mut latched) {
                                requests.extend(panel.handle_input(&event, now));
                            }
                        }
                    }
                    Pending::EndOfScript => {
                        if elapsed_s > script_duration_s + script_grace_s {
                            info!("End of input script reached, stopping");
                            break 'main;
                        }
                    }
                }
            }
        }

        // ---- GAMEPAD CONNECTIONS ----

        if let Some(ref mut d) = device {
            for event in d.poll_events() {
                requests.extend(panel.handle_input(&event, now));
            }
        }

        // ---- NETWORK COMPLETIONS ----

        for completion in net.drain() {
            panel.handle_completion(completion, now);
        }

        // ---- SCHEDULED TASKS ----

        let gamepad: &mut dyn GamepadSource = match device {
            Some(ref mut d) => d,
            None => &mut latched,
        };
        requests.extend(panel.tick(gamepad, now));

        for req in requests {
            net.submit(req);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }
    }

    // ---- SHUTDOWN ----

    panel.shutdown();
    info!("{} requests made", net.num_submitted);

    session.exit();

    info!("End of execution");

    Ok(())
}
