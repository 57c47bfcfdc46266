//! Integration tests for imagestash
//!
//! Each test runs against a throwaway HTTP server on the loopback interface.

mod resolver_tests {
    use bytes::Bytes;
    use imagestash::config::Config;
    use imagestash::{
        DiskStore, DiskTier, ErrorKind, LoadKind, MemoryStore, MemoryTier, NetworkTier, Resolver,
        TierSource, Tiers,
    };
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn png() -> Vec<u8> {
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.extend_from_slice(b"\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0");
        data
    }

    /// Loopback server answering a fixed set of paths
    struct ImageServer {
        addr: SocketAddr,
        hits: Arc<AtomicUsize>,
    }

    impl ImageServer {
        async fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let hits = Arc::new(AtomicUsize::new(0));

            let counter = hits.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(stream));
                }
            });

            Self { addr, hits }
        }

        fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    async fn serve(mut stream: TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = String::from_utf8_lossy(&request);
        let path = head.split_whitespace().nth(1).unwrap_or("/");

        let (status, content_type, body) = match path {
            "/photos/large.png" => ("200 OK", "image/png", png()),
            "/photos/page.html" => ("200 OK", "text/html", b"<html>hello</html>".to_vec()),
            _ => ("404 Not Found", "text/plain", b"missing".to_vec()),
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            content_type,
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.write_all(&body).await;
        let _ = stream.shutdown().await;
    }

    fn tiers_in(dir: &TempDir) -> (Arc<MemoryTier>, Arc<DiskTier>, Tiers) {
        let memory = Arc::new(MemoryTier::default());
        let disk = Arc::new(DiskTier::new(dir.path()));
        let network = Arc::new(NetworkTier::from_config(&Default::default()));
        let tiers = Tiers::new(memory.clone(), disk.clone(), network);
        (memory, disk, tiers)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn network_then_memory_then_disk() {
        let server = ImageServer::start().await;
        let temp = TempDir::new().unwrap();
        let (memory, disk, tiers) = tiers_in(&temp);
        let resolver = Resolver::new(tiers.clone());
        let url = server.url("/photos/large.png");

        let state = resolver.resolve("testKey", &url).await;
        assert_eq!(state.source(), Some(TierSource::Network));
        assert_eq!(state.image().unwrap().data(), &Bytes::from(png()));
        assert!(temp.path().join("testKey.cache").exists());
        assert_eq!(server.hits(), 1);

        let state = resolver.resolve("testKey", &url).await;
        assert_eq!(state.source(), Some(TierSource::Memory));
        assert_eq!(server.hits(), 1);

        // A fresh memory tier over the same directory reads from disk
        let fresh_memory = Arc::new(MemoryTier::default());
        let restarted = Resolver::new(Tiers::new(
            fresh_memory.clone(),
            disk.clone(),
            tiers.network.clone(),
        ));
        let state = restarted.resolve("testKey", &url).await;
        assert_eq!(state.source(), Some(TierSource::Disk));
        assert_eq!(fresh_memory.get("testKey").unwrap(), Some(Bytes::from(png())));
        assert_eq!(server.hits(), 1);

        assert_eq!(memory.get("testKey").unwrap(), Some(Bytes::from(png())));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn not_found_fails_and_caches_nothing() {
        let server = ImageServer::start().await;
        let temp = TempDir::new().unwrap();
        let (memory, disk, tiers) = tiers_in(&temp);
        let resolver = Resolver::new(tiers);

        let state = resolver.resolve("gone", &server.url("/photos/gone.png")).await;

        assert_eq!(state.kind(), LoadKind::Failed);
        assert_eq!(state.error().unwrap().kind(), ErrorKind::BadResponse);
        assert!(state.error().unwrap().to_string().contains("404"));
        assert_eq!(memory.get("gone").unwrap(), None);
        assert_eq!(disk.retrieve_image("gone").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn non_image_body_fails_to_decode() {
        let server = ImageServer::start().await;
        let temp = TempDir::new().unwrap();
        let (memory, _disk, tiers) = tiers_in(&temp);
        let resolver = Resolver::new(tiers);

        let state = resolver.resolve("page", &server.url("/photos/page.html")).await;

        assert_eq!(state.kind(), LoadKind::Failed);
        assert_eq!(state.error().unwrap().kind(), ErrorKind::Decode);
        assert_eq!(memory.get("page").unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn closed_port_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let temp = TempDir::new().unwrap();
        let (_memory, _disk, tiers) = tiers_in(&temp);
        let resolver = Resolver::new(tiers);

        let state = resolver
            .resolve("offline", &format!("http://{}/a.png", addr))
            .await;

        assert_eq!(state.kind(), LoadKind::Failed);
        let err = state.error().unwrap();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn refresh_after_failure_uses_same_request() {
        let server = ImageServer::start().await;
        let temp = TempDir::new().unwrap();
        let (_memory, disk, tiers) = tiers_in(&temp);
        let resolver = Resolver::new(tiers);

        let state = resolver.resolve("later", &server.url("/photos/later.png")).await;
        assert_eq!(state.kind(), LoadKind::Failed);

        // Populate disk out of band, then refresh
        disk.save("later", &Bytes::from(png())).await.unwrap();
        let state = resolver.refresh().await.unwrap();

        assert_eq!(state.source(), Some(TierSource::Disk));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolutions_all_succeed() {
        let server = ImageServer::start().await;
        let temp = TempDir::new().unwrap();
        let (_memory, disk, tiers) = tiers_in(&temp);
        let resolver = Arc::new(Resolver::new(tiers));
        let url = server.url("/photos/large.png");

        let a = resolver.start("shared", &url);
        let b = resolver.start("shared", &url);
        let (a, b) = tokio::join!(a.finish(), b.finish());

        assert_eq!(a.kind(), LoadKind::Success);
        assert_eq!(b.kind(), LoadKind::Success);
        // Not coalesced: either both fetched or the second hit a cache
        assert!((1..=2).contains(&server.hits()));
        assert_eq!(disk.retrieve_image("shared").await.unwrap(), Some(Bytes::from(png())));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn tiers_from_config_use_configured_directory() {
        let server = ImageServer::start().await;
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.disk.directory = Some(temp.path().join("images"));
        config.memory.count_limit = 10;

        let resolver = Resolver::new(Tiers::from_config(&config).unwrap());
        let state = resolver
            .resolve("configured", &server.url("/photos/large.png"))
            .await;

        assert_eq!(state.kind(), LoadKind::Success);
        assert!(temp.path().join("images").join("configured.cache").exists());
    }
}
