use log::*;
use ripcurl::client::{Event, EventClient};
use ripcurl::config::Settings;
use ripcurl::message::Message;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() {
    env_logger::init();

    let (client, mut events) = EventClient::connect("ws://127.0.0.1:9002/", Settings::default())
        .await
        .expect("failed to connect");

    while let Some(event) = events.next().await {
        match event {
            Event::Open => {
                info!("sending a ping");
                client.send_ping(b"hello".to_vec());
            }
            Event::Message(Message::Pong(payload)) => {
                info!("got pong back: {:?}", String::from_utf8_lossy(&payload));
                client.disconnect(false);
            }
            Event::Message(other) => info!("unexpected message: {:?}", other),
            Event::Close(code) => {
                info!("closed with code {}", code.as_u16());
                break;
            }
            Event::Error(err) => error!("{err}"),
            Event::Frame(_) => {}
        }
    }
}
