use crate::adapter::Adapter;
use crate::channel::CommandError;
use crate::responses::Terminal;
use crate::stack::{DatagramSender, PayloadStatus, SendError, SocketType};
use crate::tests::mock::{MockTransport, SimTimer};
use alloc::string::ToString;
use alloc::vec;

type AdapterType<'a> = Adapter<'a, MockTransport, SimTimer, 1_000_000>;

/// Mocks mode, connect and prompt responses
fn add_connect_responses(transport: &mut MockTransport) {
    transport.add_ok_response();
    transport.add_response(b"CONNECT\r\n\r\nOK\r\n");
    transport.add_response(b"\r\nOK\r\n>");
}

fn add_closed_response(transport: &mut MockTransport) {
    transport.add_response(b"CLOSED\r\n\r\nOK\r\n");
}

#[test]
fn test_send_correct_commands() {
    let mut transport = MockTransport::new();
    add_connect_responses(&mut transport);
    transport.add_response(b"\r\nRecv 9 bytes\r\n\r\nSEND OK\r\n");
    add_closed_response(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"test data").unwrap();

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(5, commands.len());
    assert_eq!("AT+CIPMODE=0\r\n".to_string(), commands[0]);
    assert_eq!("AT+CIPSTART=\"UDP\",\"10.0.0.1\",5000\r\n".to_string(), commands[1]);
    assert_eq!("AT+CIPSEND=9\r\n".to_string(), commands[2]);
    assert_eq!("test data".to_string(), commands[3]);
    assert_eq!("AT+CIPCLOSE\r\n".to_string(), commands[4]);
}

#[test]
fn test_send_tcp() {
    let mut transport = MockTransport::new();
    add_connect_responses(&mut transport);
    transport.add_response(b"\r\nSEND OK\r\n");
    add_closed_response(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    adapter.send(SocketType::Tcp, "example.org", 21, b"QUIT").unwrap();

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!("AT+CIPSTART=\"TCP\",\"example.org\",21\r\n".to_string(), commands[1]);
}

#[test]
fn test_send_confirmed() {
    let mut transport = MockTransport::new();
    add_connect_responses(&mut transport);
    transport.add_response(b"\r\nRecv 4 bytes\r\n\r\nSEND OK\r\n");
    add_closed_response(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    let report = adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap();

    assert_eq!(4, report.length);
    assert_eq!(PayloadStatus::Confirmed, report.status);
    assert!(adapter.send_ok());
    assert_eq!(0, adapter.transport.get_pending_response_count());
}

#[test]
fn test_send_timeouts_applied() {
    let mut transport = MockTransport::new();
    add_connect_responses(&mut transport);
    transport.add_response(b"\r\nSEND OK\r\n");
    add_closed_response(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    adapter.set_send_timeout_ms(2_000);
    adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap();

    assert_eq!(
        vec![100, 5_000, 100, 5_000, 2_000, 2_000, 100, 5_000],
        adapter.timer.durations
    );
}

#[test]
fn test_send_payload_rejected_still_closed() {
    let mut transport = MockTransport::new();
    add_connect_responses(&mut transport);
    transport.add_response(b"\r\nSEND FAIL\r\n");
    add_closed_response(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    let report = adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap();

    assert_eq!(PayloadStatus::Rejected, report.status);
    assert!(adapter.send_ok());

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!("AT+CIPCLOSE\r\n".to_string(), commands[4]);
}

#[test]
fn test_send_payload_unconfirmed_still_closed() {
    let mut transport = MockTransport::new();
    add_connect_responses(&mut transport);
    transport.add_response(b"\r\nRecv 4 bytes\r\n");
    add_closed_response(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    let report = adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap();

    assert_eq!(PayloadStatus::Unconfirmed(CommandError::Timeout), report.status);

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(5, commands.len());
    assert_eq!("AT+CIPCLOSE\r\n".to_string(), commands[4]);
}

#[test]
fn test_send_prompt_missing() {
    let mut transport = MockTransport::new();
    transport.add_ok_response();
    transport.add_response(b"CONNECT\r\n\r\nOK\r\n");
    transport.add_error_response();
    add_closed_response(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    let report = adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap();

    assert_eq!(PayloadStatus::Unconfirmed(CommandError::Timeout), report.status);

    // Payload is never written without prompt
    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(4, commands.len());
    assert_eq!("AT+CIPSEND=4\r\n".to_string(), commands[2]);
    assert_eq!("AT+CIPCLOSE\r\n".to_string(), commands[3]);
}

#[test]
fn test_send_mode_error() {
    let mut transport = MockTransport::new();
    transport.add_error_response();

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    let error = adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap_err();

    assert_eq!(SendError::ModeError(CommandError::Rejected(Terminal::Error)), error);
    assert_eq!(1, adapter.transport.get_commands_as_strings().len());
}

#[test]
fn test_send_connect_error_not_closed() {
    let mut transport = MockTransport::new();
    transport.add_ok_response();
    transport.add_error_response();

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    let error = adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap_err();

    assert_eq!(SendError::ConnectError(CommandError::Rejected(Terminal::Error)), error);

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(2, commands.len());
    assert!(!commands.contains(&"AT+CIPCLOSE\r\n".to_string()));
}

#[test]
fn test_send_close_error() {
    let mut transport = MockTransport::new();
    add_connect_responses(&mut transport);
    transport.add_response(b"\r\nSEND OK\r\n");
    transport.add_error_response();

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    let error = adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap_err();

    assert_eq!(SendError::CloseError(CommandError::Rejected(Terminal::Error)), error);

    // Close is sent exactly once
    let commands = adapter.transport.get_commands_as_strings();
    let closes = commands.iter().filter(|command| command.as_str() == "AT+CIPCLOSE\r\n").count();
    assert_eq!(1, closes);
}

#[test]
fn test_send_ok_consumes_failure() {
    let mut transport = MockTransport::new();
    transport.add_error_response();

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap_err();

    assert!(!adapter.send_ok());
    assert!(adapter.send_ok());
}

#[test]
fn test_send_ok_reset_by_successful_send() {
    let mut transport = MockTransport::new();
    transport.add_error_response();
    add_connect_responses(&mut transport);
    transport.add_response(b"\r\nSEND OK\r\n");
    add_closed_response(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap_err();
    adapter.send(SocketType::Udp, "10.0.0.1", 5000, b"ping").unwrap();

    assert!(adapter.send_ok());
}

#[test]
fn test_send_datagram_uses_udp() {
    let mut transport = MockTransport::new();
    add_connect_responses(&mut transport);
    transport.add_response(b"\r\nSEND OK\r\n");
    add_closed_response(&mut transport);

    let mut adapter: AdapterType = Adapter::new(transport, SimTimer::new());
    let report = adapter.send_datagram("46.23.86.61", 9090, &[0xCE, 0x00, 0xFF]).unwrap();

    assert_eq!(3, report.length);

    let chunks = adapter.transport.get_chunks();
    assert_eq!(b"AT+CIPSTART=\"UDP\",\"46.23.86.61\",9090\r\n".to_vec(), chunks[1]);
    assert_eq!(b"AT+CIPSEND=3\r\n".to_vec(), chunks[2]);
    assert_eq!(vec![0xCE, 0x00, 0xFF], chunks[3]);
}
