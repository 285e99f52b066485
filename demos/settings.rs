use sovran_persdata::{PersData, StoreError};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq)]
enum Theme {
    #[default]
    Light,
    Dark,
}

/// Settings shared between independent UI panels
fn main() -> Result<(), StoreError> {
    let themes = Arc::new(PersData::<String, Theme>::new());
    let key = "ui.theme".to_string();

    // The sidebar and the editor both follow the theme
    for panel in ["sidebar", "editor"] {
        themes.subscribe(&key, move |old, new| {
            println!("{} switching from {:?} to {:?}", panel, old, new);
        })?;
    }

    themes.set_value(&key, Theme::Dark)?;
    themes.set_value(&key, Theme::Dark)?; // no change, nobody is told
    themes.set_value(&key, Theme::Light)?;

    let persistent = themes.try_get_persistent(&"ui.zoom".to_string())?;
    println!(
        "ui.zoom found: {}, treated as persistent: {}",
        persistent.is_found(),
        persistent.value()
    );

    Ok(())
}
