//! Extracts addresses and events from a file of concatenated emails.
//!
//! ```bash
//! ollama pull llama3
//! cargo run --example extract_contacts -- data/info.txt
//! ```

#![allow(clippy::print_stdout)]

use shapecall::prelude::*;
use tracing_subscriber::EnvFilter;

const MAX_WORDS: usize = 2000;

const INSTRUCTIONS: &str = "\
The source text is a series of emails that have been put into a single file. \
They are separated by three dashes. \
Review the source text and determine the full address of the person sending each of the emails \
as well as any events that we need to track. If they provide a company address use that. \
If any extra info is provided, such as a description of the place, or a floor, add it to extraInfo. \
Set eventsQuantity to the number of events tracked and addressesQuantity to the number of addresses tracked. \
Don't stuff an event into the output that isn't an event.";

fn schema() -> Schema {
    let text = |description: &str| Field::string().describe(description);

    let event = ObjectSchema::new()
        .field("name", text("Name of the event"))
        .field("date", text("Date of the event"))
        .field("location", text("Location of the event"))
        .field(
            "extraInfo",
            text("Any extra information that is provided about the event."),
        );
    let person = ObjectSchema::new()
        .field("name", text("Name of the person"))
        .field("company", text("Name of the company where they work"))
        .field(
            "street",
            text(
                "Street address of the person or company. This is only the street name and the \
                 numerical address. Do not include city, state, or zip of the address in this field.",
            ),
        )
        .field("city", text("City portion of the address of the person or company"))
        .field("state", text("State portion of the address of the person or company"))
        .field("zip", text("Zip code of the person or company"))
        .field(
            "extraInfo",
            text("Any extra information that is provided about the location."),
        );

    Schema::new()
        .field(
            "eventsQuantity",
            Field::integer().describe("The number of events in the source text"),
        )
        .field(
            "addressesQuantity",
            Field::integer().describe("The number of addresses in the source text"),
        )
        .field("events", Field::array(SchemaType::Object(event)))
        .field("people", Field::array(SchemaType::Object(person)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./data/info.txt".to_owned());
    let source = tokio::fs::read_to_string(&path).await?;
    let source = source
        .split(' ')
        .take(MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    let question = format!("{INSTRUCTIONS}\n\nSource Text:\n{source}");
    let responder = Responder::ollama(OllamaConfig::from_env())?;

    match responder.respond(&question, &schema(), []).await? {
        Ok(value) => println!("{value:#}"),
        Err(failure) => println!("{failure}\nraw: {}", failure.raw),
    }

    Ok(())
}
