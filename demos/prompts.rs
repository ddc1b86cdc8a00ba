use std::path::Path;

use konfigure::{dump, load, ConfigNode, TemplateValue};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), konfigure::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut prompts = load("demos/prompts.yaml");

    let vars = json!({
        "assistant_name": "ConfigBot",
        "domain": "configuration management",
        "current_date": "2024-01-01",
        "user_name": "Alice",
        "topic": "YAML configuration",
        "error_reason": "the service is temporarily unavailable",
        "source": "the documentation",
        "answer": "YAML is a human-friendly data serialization standard",
        "additional_info": [
            "YAML stands for 'YAML Ain't Markup Language'",
            "It's commonly used for configuration files"
        ]
    });

    if let Some(system) = prompts.template("system_prompt") {
        println!("System prompt:\n{}", system.render(&vars)?);
    }

    if let Some(user) = prompts.node("user_prompt_templates") {
        for (name, value) in user.iter() {
            if let Some(template) = value.as_template() {
                println!("{name}: {}", template.render(&vars)?);
            }
        }
    }

    for response in prompts["response_templates"].as_list().unwrap_or_default() {
        let name = response["name"].as_str().unwrap_or("unnamed");
        if let Some(template) = response["template"].as_template() {
            println!("{name}: {}", template.render(&vars)?);
        }
    }

    if let Some(user) = prompts.node_mut("user_prompt_templates") {
        user.set(
            "greeting",
            "Hi {{ user_name }}! How may I assist you with {{ domain }} today?",
        );
    }

    let mut bullets = ConfigNode::new();
    bullets.set("name", "bullet_list");
    bullets.set(
        "template",
        TemplateValue::new("{{#each additional_info}}• {{this}}\n{{/each}}"),
    );
    prompts.push("response_templates", bullets);

    if let Some(template) = prompts["response_templates"][2]["template"].as_template() {
        println!("bullet_list:\n{}", template.render(&vars)?);
    }

    let saved = dump(&prompts, Some(Path::new("target/demos/modified_prompts.yaml")))?;
    println!("saved modified prompts: {saved}");

    Ok(())
}
