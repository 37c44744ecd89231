use anyhow::Result;

fn main() -> Result<()> {
    vcf2core::cli::run()
}
