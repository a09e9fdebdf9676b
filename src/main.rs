fn main() -> anyhow::Result<()> {
    classwatch_lib::run()
}
