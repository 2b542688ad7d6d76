//! Accept-everything SMTP server recording each delivered message
#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::Mutex,
    task::JoinHandle,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivered {
    pub from: String,
    pub to: String,
    pub content: String,
}

pub struct SinkServer {
    addr: SocketAddr,
    delivered: Arc<Mutex<Vec<Delivered>>>,
    task: JoinHandle<()>,
}

impl SinkServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let delivered = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn({
            let delivered = Arc::clone(&delivered);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let delivered = Arc::clone(&delivered);
                    tokio::spawn(async move {
                        let _ = serve(stream, delivered).await;
                    });
                }
            }
        });

        Ok(Self {
            addr,
            delivered,
            task,
        })
    }

    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().await.clone()
    }
}

impl Drop for SinkServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    delivered: Arc<Mutex<Vec<Delivered>>>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let mut current = Delivered::default();

    writer.write_all(b"220 sink ready\r\n").await?;

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let command = line.trim_end();

        let reply: &[u8] = if command.starts_with("EHLO") {
            b"250-sink\r\n250 AUTH PLAIN\r\n"
        } else if command.starts_with("AUTH") {
            b"235 ok\r\n"
        } else if let Some(from) = command.strip_prefix("MAIL FROM:") {
            current.from = from.trim_matches(['<', '>']).to_string();
            b"250 ok\r\n"
        } else if let Some(to) = command.strip_prefix("RCPT TO:") {
            current.to = to.trim_matches(['<', '>']).to_string();
            b"250 ok\r\n"
        } else if command == "DATA" {
            writer.write_all(b"354 go ahead\r\n").await?;
            loop {
                line.clear();
                if reader.read_line(&mut line).await? == 0 {
                    return Ok(());
                }
                if line == ".\r\n" {
                    break;
                }
                current.content.push_str(&line);
            }
            delivered.lock().await.push(std::mem::take(&mut current));
            b"250 queued\r\n"
        } else if command == "QUIT" {
            writer.write_all(b"221 bye\r\n").await?;
            return Ok(());
        } else {
            b"500 unknown\r\n"
        };

        writer.write_all(reply).await?;
    }
}
