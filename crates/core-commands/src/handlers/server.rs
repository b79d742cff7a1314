//! Server-level commands: `backlight`, `output`, `info`, `noop`.

use core_model::{BacklightMode, ClientKey};
use core_proto::response;
use core_state::ServerState;

use crate::{CmdResult, CommandError, Reply};

/// `backlight {on|off|toggle|blink|flash|open}` - the client's preference,
/// consulted by the per-screen cascade.
pub fn backlight(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    let [_, value] = args else {
        return Err(CommandError::Usage("backlight {on|off|toggle|blink|flash}"));
    };
    let current = state.store.client(client).and_then(|c| c.backlight);
    let parsed = BacklightMode::parse(value, current)
        .ok_or_else(|| CommandError::Protocol(format!("bad backlight \"{value}\"")))?;
    if let Some(c) = state.store.client_mut(client) {
        c.backlight = parsed;
    }
    Ok(Reply::Success)
}

/// `output {on|off|<int>}` - raw output-port state, forwarded to drivers.
pub fn output(state: &mut ServerState, _client: ClientKey, args: &[String]) -> CmdResult {
    let [_, value] = args else {
        return Err(CommandError::Usage("output {on|off|<int>}"));
    };
    let bits = match value.as_str() {
        "on" => -1,
        "off" => 0,
        other => other
            .parse::<i64>()
            .map_err(|_| CommandError::Protocol(format!("bad output value \"{other}\"")))?,
    };
    state.output_state = bits;
    state.drivers.output(bits);
    Ok(Reply::Success)
}

/// `info` - the output driver's description string.
pub fn info(state: &mut ServerState, _client: ClientKey, _args: &[String]) -> CmdResult {
    let text = state.drivers.info().replace('\n', "; ");
    Ok(Reply::Line(format!("{text}\n")))
}

/// `noop` - liveness probe.
pub fn noop(_state: &mut ServerState, _client: ClientKey, _args: &[String]) -> CmdResult {
    Ok(Reply::Line(response::noop_complete()))
}

#[cfg(test)]
mod tests {
    use crate::dispatcher::dispatch_line;
    use crate::dispatcher::tests::{connect, new_state};
    use core_model::BacklightMode;

    #[test]
    fn backlight_updates_the_client_preference() {
        let mut state = new_state();
        let (c, mut rx) = connect(&mut state);
        dispatch_line(&mut state, c, "hello");
        rx.try_recv().unwrap();
        dispatch_line(&mut state, c, "backlight off");
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        assert_eq!(
            state.store.client(c).unwrap().backlight,
            Some(BacklightMode::OFF)
        );
        dispatch_line(&mut state, c, "backlight toggle");
        rx.try_recv().unwrap();
        assert_eq!(
            state.store.client(c).unwrap().backlight,
            Some(BacklightMode::ON)
        );
        dispatch_line(&mut state, c, "backlight dim");
        assert_eq!(rx.try_recv().unwrap(), "huh? bad backlight \"dim\"\n");
    }

    #[test]
    fn output_accepts_keywords_and_integers() {
        let mut state = new_state();
        let (c, mut rx) = connect(&mut state);
        dispatch_line(&mut state, c, "hello");
        rx.try_recv().unwrap();
        dispatch_line(&mut state, c, "output on");
        rx.try_recv().unwrap();
        assert_eq!(state.output_state, -1);
        dispatch_line(&mut state, c, "output 5");
        rx.try_recv().unwrap();
        assert_eq!(state.output_state, 5);
        dispatch_line(&mut state, c, "output banana");
        assert_eq!(
            rx.try_recv().unwrap(),
            "huh? bad output value \"banana\"\n"
        );
    }

    #[test]
    fn info_reports_the_driver_description() {
        let mut state = new_state();
        let (c, mut rx) = connect(&mut state);
        dispatch_line(&mut state, c, "hello");
        rx.try_recv().unwrap();
        dispatch_line(&mut state, c, "info");
        let line = rx.try_recv().unwrap();
        assert!(line.contains("debug driver 20x4"));
    }
}
