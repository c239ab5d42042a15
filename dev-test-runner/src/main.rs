//! Runs the demo programs end to end. `RUST_LOG=debug` shows schema
//! discovery and omitted back references.
use std::sync::{Arc, Weak};

use anyhow::Context;
use chrono::NaiveDate;
use record_coder::{Coder, ConvertError, Tree, record};

record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Person {
        pub name: String,
        pub age: i64,
        pub birthday: NaiveDate,
        pub friend: Option<Box<Person>> = None,
    }
}

record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Data {
        pub a: String,
    }
}

record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Test {
        pub string: String,
        pub digit: i64,
        pub li: Vec<i64>,
        pub data: Data,
        pub data_list: Vec<Data>,
    }
}

record! {
    #[derive(Debug)]
    pub struct Folder {
        pub name: String,
        pub parent: Weak<Folder>,
        pub children: Vec<Arc<Folder>>,
    }
}

fn person_coder() -> anyhow::Result<Coder<Person>> {
    let coder = Coder::<Person>::builder()
        .field_decoder::<Person, _, _>("birthday", |raw: &Tree| {
            raw.expect_str()?.parse::<NaiveDate>().map_err(ConvertError::new)
        })
        .text_encoder(|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
        .build()?;
    Ok(coder)
}

fn run_quickstart() -> anyhow::Result<()> {
    let coder = person_coder()?;
    let data = r#"{"name": "High Time", "age": 30, "birthday": "1991-04-01"}"#;

    let person = coder.from_text(data).context("decoding quickstart person")?;
    println!("{person:?}");
    println!("{:?}", coder.to_tree(&person)?);
    println!("{}", coder.to_text(&person)?);
    Ok(())
}

fn run_self_nested() -> anyhow::Result<()> {
    let coder = person_coder()?;
    let data = r#"{"name": "High Time", "age": 26, "birthday": "1995-04-01", "friend": {"name": "All Cats", "age": 26, "birthday": "1995-04-12"}}"#;

    let person = coder.from_text(data).context("decoding nested person")?;
    println!("{person:?}");
    println!("{}", coder.to_text_pretty(&person)?);
    anyhow::ensure!(coder.from_text(&coder.to_text(&person)?)? == person, "round trip changed the value");
    log::info!("self-nested round trip preserved `{}`", person.name);
    Ok(())
}

fn run_collections() -> anyhow::Result<()> {
    let coder = Coder::<Test>::new()?;
    let test = Test {
        string: "asadsf".into(),
        digit: 234234,
        li: vec![1, 23, 234, 5, 4534, 653, 65],
        data: Data { a: "sfgdfg".into() },
        data_list: vec![Data { a: "aaaaaaaa".into() }, Data { a: "bbbbb".into() }],
    };

    let tree = coder.to_tree(&test)?;
    println!("{tree:?}");
    println!("{}", coder.to_text(&test)?);
    println!("{:?}", coder.from_tree(&tree)?);
    Ok(())
}

fn run_back_references() -> anyhow::Result<()> {
    let coder = Coder::<Folder>::new()?;
    let root = Arc::new_cyclic(|me: &Weak<Folder>| Folder {
        name: "/".into(),
        parent: Weak::new(),
        children: vec![Arc::new(Folder { name: "usr".into(), parent: me.clone(), children: vec![] })],
    });
    println!("{}", coder.to_text_pretty(&root)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    eprintln!("-- quickstart --");
    run_quickstart()?;
    eprintln!("-- self nested --");
    run_self_nested()?;
    eprintln!("-- collections --");
    run_collections()?;
    eprintln!("-- back references --");
    run_back_references()?;
    Ok(())
}
