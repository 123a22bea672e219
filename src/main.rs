fn main() -> anyhow::Result<()> {
    marginalia_lib::run()
}
