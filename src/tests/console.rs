use crate::adapter::Adapter;
use crate::console::ConsoleGuard;
use crate::tests::adapter::add_init_responses;
use crate::tests::mock::{MockTransport, Route, SimTimer};
use crate::transport::ModemLink;
use alloc::string::ToString;
use alloc::vec;

type AdapterType<'a> = Adapter<'a, MockTransport, SimTimer, 1_000_000>;

fn initialized_adapter<'a>(mut transport: MockTransport) -> AdapterType<'a> {
    add_init_responses(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    adapter.init(3, 115_200).unwrap();
    adapter.timer.durations.clear();
    adapter
}

#[test]
fn test_log_format() {
    let mut adapter = initialized_adapter(MockTransport::new());
    adapter.enable_debug(true);

    adapter.log("+++", "AT+GMR");

    assert_eq!("+++ AT+GMR\r\n".to_string(), adapter.transport.get_console_output());
}

#[test]
fn test_log_array_format() {
    let mut adapter = initialized_adapter(MockTransport::new());
    adapter.enable_debug(true);

    adapter.log_array("---", ["OK", "WIFI GOT IP"]);

    assert_eq!(
        "--- (2) OK\r\n--- (11) WIFI GOT IP\r\n".to_string(),
        adapter.transport.get_console_output()
    );

    // Console is acquired once for all messages
    let consoles = adapter.transport.get_routes().iter().filter(|route| **route == Route::Console).count();
    assert_eq!(1, consoles);
}

#[test]
fn test_log_link_restored() {
    let mut adapter = initialized_adapter(MockTransport::new());
    adapter.enable_debug(true);

    adapter.log("+++", "AT");

    assert_eq!(
        &[
            Route::Modem(3, 9_600),
            Route::Modem(3, 115_200),
            Route::Console,
            Route::Modem(3, 115_200)
        ],
        adapter.transport.get_routes()
    );

    // Settle delay before and after switching
    assert_eq!(vec![100, 100], adapter.timer.durations);
}

#[test]
fn test_log_disabled_noop() {
    let mut adapter = initialized_adapter(MockTransport::new());

    adapter.log("+++", "AT");
    adapter.log_array("---", ["OK"]);

    assert!(adapter.transport.get_console_output().is_empty());
    assert_eq!(2, adapter.transport.get_routes().len());
    assert!(adapter.timer.durations.is_empty());
}

#[test]
fn test_log_without_link_noop() {
    let mut adapter: AdapterType = Adapter::new(MockTransport::new(), SimTimer::new());
    adapter.enable_debug(true);

    adapter.log("+++", "AT");

    assert!(adapter.transport.get_console_output().is_empty());
    assert!(adapter.transport.get_routes().is_empty());
}

#[test]
fn test_log_console_error_reattaches_link() {
    let mut transport = MockTransport::new();
    transport.simulate_console_error();

    let mut adapter = initialized_adapter(transport);
    adapter.enable_debug(true);

    adapter.log("+++", "AT");

    assert!(adapter.transport.get_console_output().is_empty());
    assert_eq!(Some(&Route::Modem(3, 115_200)), adapter.transport.get_routes().last());
}

#[test]
fn test_debug_mirrors_exchange() {
    let mut adapter = initialized_adapter(MockTransport::new());
    adapter.transport.add_response(b"AT version:1.3.0.0\r\n\r\nOK\r\n");
    adapter.enable_debug(true);

    adapter.send_at("+GMR").unwrap();

    assert_eq!(
        "+++ AT+GMR\r\n--- (18) AT version:1.3.0.0\r\n--- (2) OK\r\n".to_string(),
        adapter.transport.get_console_output()
    );

    // Console output never reaches the modem
    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!("AT+GMR\r\n".to_string(), commands[3]);
    assert_eq!(4, commands.len());
}

#[test]
fn test_guard_restores_link_on_drop() {
    let mut transport = MockTransport::new();
    let mut timer = SimTimer::new();

    {
        let mut console: ConsoleGuard<'_, _, _, 1_000_000> =
            ConsoleGuard::acquire(&mut transport, &mut timer, ModemLink::new(5, 9_600)).unwrap();
        console.write_line(&["first", " line"]).unwrap();
    }

    assert_eq!("first line\r\n".to_string(), transport.get_console_output());
    assert_eq!(&[Route::Console, Route::Modem(5, 9_600)], transport.get_routes());
    assert!(transport.get_commands_as_strings().is_empty());
}
