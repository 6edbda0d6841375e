fn main() -> anyhow::Result<()> {
    sdxbench::run(sdxbench::OPERATIONS)
}
