//! # End-to-End Server Tests
//!
//! A node runtime served over loopback: concurrent clients, packet
//! recording to individual files, and a shutdown that leaves nothing
//! behind.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    use rand::distributions::Alphanumeric;
    use rand::Rng;

    use ag_05_server::{status_value, ServerState, SocketState};
    use asgard_node::{NodeConfig, NodeRuntime};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn make_config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.server.socket.port = 0;
        config.server.threads.min_threads = 2;
        config.server.threads.max_threads = 4;
        config.server.accept_timeout = Duration::from_millis(16);
        config
    }

    fn with_packet_dump(mut config: NodeConfig, dir: &Path) -> NodeConfig {
        config.server.packets.enabled = true;
        config.server.packets.individual_files = true;
        config.server.packets.path = dir.to_path_buf();
        config.server.packets.filename = "e2e.packet".to_string();
        config
    }

    fn round_trip(address: SocketAddr, request: &[u8]) -> Vec<u8> {
        let mut client = TcpStream::connect(address).unwrap();
        client.write_all(request).unwrap();
        let mut reply = Vec::new();
        client.read_to_end(&mut reply).unwrap();
        reply
    }

    fn random_word(len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    // =============================================================================
    // E2E: TRANSACTIONS
    // =============================================================================

    #[test]
    fn test_concurrent_clients_get_their_own_replies() {
        let runtime = NodeRuntime::new(make_config()).unwrap();
        let address = runtime.start().unwrap();

        let clients: Vec<_> = (0..8)
            .map(|_| {
                thread::spawn(move || {
                    for _ in 0..5 {
                        let word = random_word(24);
                        let reply = round_trip(address, format!("echo {word}\r\n").as_bytes());
                        assert_eq!(reply, format!("{word}\r\n").as_bytes());
                    }
                })
            })
            .collect();
        for client in clients {
            client.join().unwrap();
        }

        let status = runtime.server().get_status().unwrap();
        assert_eq!(status_value(&status, "metricTransactionCount"), Some("40"));
        assert_eq!(status_value(&status, "errorTotal"), Some("0"));

        runtime.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_returns_pool_to_zero() {
        let runtime = NodeRuntime::new(make_config()).unwrap();
        let address = runtime.start().unwrap();
        assert_eq!(runtime.server().current_thread_count(), 2);

        assert_eq!(round_trip(address, b"ping\r\n"), b"PONG\r\n");
        runtime.shutdown().unwrap();

        let server = runtime.server();
        assert_eq!(server.state(), ServerState::Stopped);
        assert_eq!(server.pool_size(), 0);
        assert_eq!(server.socket_state(), SocketState::Closed);
        assert!(TcpStream::connect(address).is_err());
    }

    // =============================================================================
    // E2E: PACKET RECORDING
    // =============================================================================

    #[test]
    fn test_packets_recorded_to_individual_files() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = NodeRuntime::new(with_packet_dump(make_config(), dir.path())).unwrap();
        let address = runtime.start().unwrap();

        assert_eq!(round_trip(address, b"ping\r\n"), b"PONG\r\n");
        runtime.shutdown().unwrap();

        let request = fs::read_to_string(dir.path().join("e2e.packet.0")).unwrap();
        assert!(request.contains("begin packet #0"));
        assert!(request.contains("ping\r\n"));

        let response = fs::read_to_string(dir.path().join("e2e.packet.1")).unwrap();
        assert!(response.contains("PONG\r\n"));
        assert!(response.contains("end packet #1"));
        assert!(!dir.path().join("e2e.packet").exists());
    }
}
