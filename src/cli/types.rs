use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum CacheArgs {
    /// Print the number of stored searches and the store path
    Stats {},

    /// Remove every stored search
    Clear {},
}
