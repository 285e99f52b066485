use sovran_persdata::{KeyId, KeyInterner, PersData, StoreError, StoreRegistry, SubscriptionId};

/// A component bound to one key, initialised from a configured default
struct Counter {
    key: KeyId,
    store: PersData<KeyId, u32>,
    subscription: SubscriptionId,
}

impl Counter {
    fn activate(
        registry: &StoreRegistry<KeyId>,
        key: KeyId,
        default: u32,
        persistent: bool,
    ) -> Result<Self, StoreError> {
        let store = registry.store::<u32>()?;

        // Only the first activation applies the default
        if !store.try_get_value(&key)?.is_found() {
            store.set_value_with_persistence(&key, default, persistent)?;
        }

        let subscription = store.subscribe(&key, move |old, new| {
            println!("  {:?}: {} -> {}", key, old, new);
        })?;

        Ok(Self {
            key,
            store,
            subscription,
        })
    }

    fn add(&self, amount: u32) -> Result<(), StoreError> {
        let current = self.store.get_value(&self.key)?;
        self.store.set_value(&self.key, current + amount)
    }

    fn deactivate(self) -> Result<(), StoreError> {
        self.store.unsubscribe(&self.key, self.subscription)?;
        Ok(())
    }
}

fn main() -> Result<(), StoreError> {
    env_logger::init();

    let keys = KeyInterner::new();
    let registry = StoreRegistry::<KeyId>::new();

    let coins = keys.intern("coins")?;
    let switches = keys.intern("switches_pulled")?;

    println!("Scene 1:");
    let coin_counter = Counter::activate(&registry, coins, 0, true)?;
    let switch_counter = Counter::activate(&registry, switches, 0, false)?;
    coin_counter.add(5)?;
    switch_counter.add(1)?;
    switch_counter.add(1)?;
    coin_counter.deactivate()?;
    switch_counter.deactivate()?;

    let removed = registry.clear_non_persistent()?;
    println!("Scene unloaded, {} entries cleared", removed);

    println!("Scene 2:");
    let coin_counter = Counter::activate(&registry, coins, 0, true)?;
    let switch_counter = Counter::activate(&registry, switches, 0, false)?;
    coin_counter.add(3)?;

    let store = registry.store::<u32>()?;
    for key in [coins, switches] {
        println!(
            "  {}: {} (persistent: {})",
            keys.name_of(key)?.unwrap_or_default(),
            store.get_value(&key)?,
            store.get_persistent(&key)?
        );
    }

    coin_counter.deactivate()?;
    switch_counter.deactivate()?;
    Ok(())
}
