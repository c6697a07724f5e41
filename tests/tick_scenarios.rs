//! Tick-by-tick scenarios driven through the console and broker, without a
//! network or a timer.

use pester::broker::Broker;
use pester::console::{Console, ConsoleEvent};
use pester::input::{CommandInterpreter, Symbol};
use pester::protocol::{ServerFrame, Signal};
use pester::scheduler::{ScheduleConfig, ScriptedRandom, TickOutcome, TickScheduler};
use pester::session::{ConnectionId, PeerInfo};
use pester::toggles::{Action, Behavior};
use tokio::sync::broadcast;

fn peer(name: &str) -> PeerInfo {
    PeerInfo::new(Some(name), "127.0.0.1:40001".parse().unwrap())
}

fn drain(rx: &mut broadcast::Receiver<ServerFrame>) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

fn scheduler(values: impl IntoIterator<Item = f64>) -> TickScheduler {
    TickScheduler::with_random(ScheduleConfig::default(), ScriptedRandom::new(values))
}

#[test]
fn rickroll_waits_for_a_peer_then_fires_once() {
    let console = Console::new();
    let broker = Broker::new();
    let mut rx = broker.subscribe();
    let interp = CommandInterpreter::default();
    let mut sched = scheduler([]);

    console.handle_symbol(&interp, Symbol::Char('l'));
    let report = sched.tick(&console, &broker);
    assert_eq!(report.outcome, TickOutcome::NoPeers);
    assert!(drain(&mut rx).is_empty());
    assert!(console.toggles().is_pending(Action::Rickroll));

    let _guard = console.connect(ConnectionId::new(), peer("ana"));
    sched.tick(&console, &broker);
    assert_eq!(drain(&mut rx), vec![ServerFrame::Message(Signal::Rickroll)]);

    sched.tick(&console, &broker);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn wiggle_follows_random_draws() {
    let console = Console::new();
    let broker = Broker::new();
    let mut rx = broker.subscribe();
    let interp = CommandInterpreter::default();
    let mut sched = scheduler([0.39, 0.41]);

    let _guard = console.connect(ConnectionId::new(), peer("ana"));
    console.handle_symbol(&interp, Symbol::Char('w'));

    sched.tick(&console, &broker);
    assert_eq!(drain(&mut rx), vec![ServerFrame::Message(Signal::Wiggle)]);
    sched.tick(&console, &broker);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn last_peer_leaving_quiets_the_scheduler() {
    let console = Console::new();
    let broker = Broker::new();
    let mut rx = broker.subscribe();
    let mut sched = scheduler([]);

    let guard = console.connect(ConnectionId::new(), peer("ana"));
    {
        let mut state = console.lock();
        state.toggles.set(Behavior::Subtle, true);
        state.toggles.set(Behavior::Click, true);
    }
    sched.tick(&console, &broker);
    assert_eq!(console.snapshot().suppression, 1);

    drop(guard);
    console.lock().toggles.trigger(Action::Notification);
    let before = console.toggles();

    let report = sched.tick(&console, &broker);
    assert_eq!(report.outcome, TickOutcome::NoPeers);
    assert!(drain(&mut rx).is_empty());
    assert_eq!(console.toggles(), before);
    assert_eq!(console.snapshot().suppression, 1);
}

#[test]
fn subtle_mode_limits_emissions() {
    let console = Console::new();
    let broker = Broker::new();
    let mut rx = broker.subscribe();
    let mut sched = TickScheduler::with_random(
        ScheduleConfig::default(),
        ScriptedRandom::with_fallback([], 0.0),
    );

    let _guard = console.connect(ConnectionId::new(), peer("ana"));
    {
        let mut state = console.lock();
        state.toggles.set(Behavior::Subtle, true);
        state.toggles.set(Behavior::Wiggle, true);
    }

    let mut emitted_on = Vec::new();
    for tick in 1..=33 {
        sched.tick(&console, &broker);
        if !drain(&mut rx).is_empty() {
            emitted_on.push(tick);
        }
    }
    assert_eq!(emitted_on, vec![11, 22, 33]);
}

#[test]
fn one_shots_bypass_subtle_gate() {
    let console = Console::new();
    let broker = Broker::new();
    let mut rx = broker.subscribe();
    let interp = CommandInterpreter::default();
    let mut sched = scheduler([]);

    let _guard = console.connect(ConnectionId::new(), peer("ana"));
    console.handle_symbol(&interp, Symbol::Char('s'));
    console.handle_symbol(&interp, Symbol::Char('z'));
    console.handle_symbol(&interp, Symbol::Char('n'));

    let report = sched.tick(&console, &broker);
    assert_eq!(report.outcome, TickOutcome::Suppressed);
    assert_eq!(
        drain(&mut rx),
        vec![
            ServerFrame::Message(Signal::Sleep),
            ServerFrame::Message(Signal::Notification),
        ]
    );
}

#[test]
fn pissoff_overrides_subtle_and_chance() {
    let console = Console::new();
    let broker = Broker::new();
    let mut rx = broker.subscribe();
    let interp = CommandInterpreter::default();
    let mut sched = scheduler([]);

    let _guard = console.connect(ConnectionId::new(), peer("ana"));
    for key in ['s', 'p', 'w', 'r', 'c'] {
        console.handle_symbol(&interp, Symbol::Char(key));
    }

    for _ in 0..4 {
        sched.tick(&console, &broker);
        assert_eq!(
            drain(&mut rx),
            vec![
                ServerFrame::Message(Signal::Wiggle),
                ServerFrame::Message(Signal::Click),
                ServerFrame::Message(Signal::Capitalize),
            ]
        );
    }
    assert_eq!(console.snapshot().suppression, 0);
}

#[test]
fn consumed_one_shots_notify_display() {
    let console = Console::new();
    let broker = Broker::new();
    let mut sched = scheduler([]);

    let _guard = console.connect(ConnectionId::new(), peer("ana"));
    console.lock().toggles.trigger(Action::Rickroll);
    let mut events = console.subscribe();

    sched.tick(&console, &broker);
    assert_eq!(
        events.try_recv().unwrap(),
        ConsoleEvent::Fired {
            signals: vec![Signal::Rickroll]
        }
    );

    sched.tick(&console, &broker);
    assert!(events.try_recv().is_err());
}
