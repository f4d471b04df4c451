//! Field annotations, storage overrides and export rules reach the registry

use autocrud::{Entity, KeyKind, Registry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, Entity)]
#[storage("table:people")]
pub struct Person {
    #[crud("pk")]
    pub id: i64,
    pub full_name: String,
    #[crud("hidden")]
    #[storage("column:pw_hash")]
    pub password: String,
    #[crud("readonly;fk:teams.code")]
    pub team_code: Option<String>,
    #[serde(skip)]
    internal_note: String,
}

fn main() {
    let registry = Registry::new();
    let person = registry.parse::<Person>().unwrap();

    assert_eq!(person.name(), "Person");
    assert_eq!(person.table_name(), "people");
    assert_eq!(person.fields().len(), 4);
    assert!(person.field("internal_note").is_none());

    let pk = person.primary_key().unwrap();
    assert_eq!(pk.name, "id");
    assert_eq!(pk.key_kind(), KeyKind::Integer);

    let password = person.field("password").unwrap();
    assert!(password.is_hidden);
    assert_eq!(password.column, "pw_hash");

    let team = person.field("team_code").unwrap();
    assert!(team.is_read_only);
    assert_eq!(team.type_name, "Option<String>");
    let fk = team.foreign_key.as_ref().unwrap();
    assert_eq!((fk.table.as_str(), fk.field.as_str()), ("teams", "code"));

    let _ = Person::default().internal_note;
}
