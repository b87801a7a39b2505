use log::*;
use rand::distr::Alphanumeric;
use rand::{thread_rng, Rng};
use ripcurl::client::{Event, EventClient};
use ripcurl::config::Settings;
use tokio_stream::StreamExt;

fn generate_random_string(len: usize) -> String {
    thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

#[tokio::main]
async fn main() {
    env_logger::init();

    // A small max_frame_size forces send_text to split the payload
    // across several Continuation frames instead of one.
    let settings = Settings::builder().max_frame_size(4096).build();

    let (client, mut events) = EventClient::connect("ws://127.0.0.1:9002/", settings)
        .await
        .expect("failed to connect");

    while let Some(event) = events.next().await {
        match event {
            Event::Open => {
                let payload = generate_random_string(20_000);
                info!("sending a {}-byte message across several continuation frames", payload.len());
                client.send_text(payload);
            }
            Event::Message(message) => {
                info!("echoed back {} bytes", message.as_binary().len());
                client.disconnect(false);
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
