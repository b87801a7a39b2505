use log::*;
use ripcurl::client::{Event, EventClient};
use ripcurl::config::Settings;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() {
    env_logger::init();

    let (client, mut events) = EventClient::connect("ws://127.0.0.1:9002/", Settings::default())
        .await
        .expect("failed to connect");

    let mut round_trips = 0;

    while let Some(event) = events.next().await {
        match event {
            Event::Open => {
                info!("connected, sending a greeting");
                client.send_text("hello from ripcurl");
            }
            Event::Message(message) => {
                info!("received: {:?}", message);
                round_trips += 1;
                if round_trips >= 3 {
                    client.disconnect(false);
                } else {
                    client.send_text(format!("message #{round_trips}"));
                }
            }
            Event::Close(code) => {
                info!("closed with code {}", code.as_u16());
                break;
            }
            Event::Error(err) => error!("{err}"),
            Event::Frame(_) => {}
        }
    }
}
